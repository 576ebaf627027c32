//! Kept apart from the other tests, threads are counted for the whole process
#![cfg(target_os = "linux")]

use std::{
    convert::Infallible,
    fs,
    thread,
    time::{Duration, Instant},
};

use asynchrony::{Declaration, Resolver};
use futures::executor::block_on;

fn thread_count() -> usize {
    fs::read_dir("/proc/self/task").unwrap().count()
}

#[test]
fn timer_threads_exit_once_requests_finish() {
    let resolver = Resolver::builder()
        .add_instance("ready", 1_u32)
        .add(
            "derived",
            Declaration::new(|_| async { Ok::<_, Infallible>(2_u32) }).depends_on(["ready"]),
        )
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    let before = thread_count();
    for _ in 0..100 {
        let values = block_on(resolver.invoke(["derived", "ready"])).unwrap();
        assert_eq!(*values.get::<u32>(0).unwrap(), 2);
    }
    block_on(resolver.invoke_remaining()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while thread_count() > before && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(
        thread_count() <= before,
        "timer threads outlived their requests: before={before} after={}",
        thread_count()
    );
}
