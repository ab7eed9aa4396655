#![allow(dead_code)]

use tokio::sync::mpsc::{self, Receiver};

/// Feed a vec into a bounded channel from a background task, closing the
/// channel when the vec is exhausted.
pub fn feed<T: Send + 'static>(items: Vec<T>) -> Receiver<T> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        for item in items {
            if tx.send(item).await.is_err() {
                break;
            }
        }
    });
    rx
}
