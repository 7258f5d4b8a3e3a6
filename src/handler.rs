//! Message handler trait.
//!
//! A handler receives each decoded [`Message`] and reports success or
//! failure. The delivery loop turns success into `Ack` and failure into
//! `Reject` (see [`crate::worker`]).
//!
//! Any `FnMut(Message) -> Future<Output = HandlerResult>` closure is a
//! handler:
//!
//! ```ignore
//! worker.run(|msg: Message| async move {
//!     process(msg.body()).await?;
//!     Ok(())
//! }).await?;
//! ```
//!
//! Stateful handlers implement the trait directly and may borrow `self`
//! across the returned future.

use std::future::Future;
use std::pin::Pin;

use crate::envelope::Message;
use crate::error::BoxError;

/// Result type for handler functions.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Processes one message at a time.
pub trait MessageHandler: Send {
    /// Handle a message. Returning `Err` rejects the message and stops the
    /// delivery loop.
    fn handle(&mut self, message: Message) -> BoxFuture<'_, HandlerResult>;
}

impl<F, Fut> MessageHandler for F
where
    F: FnMut(Message) -> Fut + Send,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&mut self, message: Message) -> BoxFuture<'_, HandlerResult> {
        Box::pin((self)(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn message(tag: u64) -> Message {
        Message::new(Bytes::from_static(b"body"), Default::default(), "q", "", "q", tag)
    }

    struct Counter {
        seen: Vec<u64>,
    }

    impl MessageHandler for Counter {
        fn handle(&mut self, message: Message) -> BoxFuture<'_, HandlerResult> {
            Box::pin(async move {
                self.seen.push(message.delivery_tag());
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let mut handler = |msg: Message| async move {
            let result: HandlerResult = if msg.delivery_tag() == 2 {
                Err("boom".into())
            } else {
                Ok(())
            };
            result
        };

        assert!(handler.handle(message(1)).await.is_ok());
        let err = handler.handle(message(2)).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_stateful_handler_borrows_self() {
        let mut handler = Counter { seen: Vec::new() };

        handler.handle(message(5)).await.unwrap();
        handler.handle(message(6)).await.unwrap();

        assert_eq!(handler.seen, vec![5, 6]);
    }
}
