use std::{convert::Infallible, error::Error, thread, time::Duration};

use asynchrony::{Declaration, DynError, Resolved, Resolver};

fn main() -> Result<(), Box<dyn Error>> {
    let resolver = Resolver::builder()
        .add_instance("greeting", "hello".to_string())
        .add(
            "slow",
            Declaration::from_callback(|_, complete| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(50));
                    complete.resolve(21_u64);
                });
            }),
        )
        .add(
            "answer",
            Declaration::with_dependencies(["slow"], |deps: Resolved| async move {
                Ok::<_, DynError>(*deps.get::<u64>(0)? * 2)
            }),
        )
        .add(
            "unused",
            Declaration::new(|_| async { Ok::<_, Infallible>(vec![1, 2, 3]) }),
        )
        .timeout(Duration::from_secs(1))
        .build()?;

    println!("{:?}", resolver);

    let values = futures::executor::block_on(resolver.invoke(["answer", "greeting"]))?;
    let answer = values.get::<u64>(0)?;
    let greeting = values.get::<String>(1)?;
    println!("{greeting}, the answer is {answer}");

    let remaining = futures::executor::block_on(resolver.invoke_remaining())?;
    println!("Remaining: {:?}", remaining);
    println!("{:?}", resolver);

    Ok(())
}
