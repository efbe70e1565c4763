use super::*;

#[test]
fn no_deadline_never_expires() {
    assert!(!Deadline::none().expired());
}

#[test]
fn past_deadline_is_expired() {
    let deadline = Deadline::after(Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(5));
    assert!(deadline.expired());
}

#[test]
fn future_deadline_is_not_yet_expired() {
    let deadline = Deadline::after(Duration::from_secs(60));
    assert!(!deadline.expired());
}

#[tokio::test]
async fn race_returns_the_future_when_it_finishes_first() {
    let deadline = Deadline::after(Duration::from_secs(60));
    let result = deadline.race(async { 42 }).await;
    assert_eq!(result, Some(42));
}

#[tokio::test]
async fn race_returns_none_when_the_deadline_fires_first() {
    let deadline = Deadline::after(Duration::from_millis(5));
    let result = deadline.race(tokio::time::sleep(Duration::from_secs(60))).await;
    assert_eq!(result, None);
}

#[tokio::test]
async fn no_deadline_always_lets_the_future_finish() {
    let deadline = Deadline::none();
    let result = deadline.race(async { "done" }).await;
    assert_eq!(result, Some("done"));
}
