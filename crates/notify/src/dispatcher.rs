//! Routes messages to the notifiers registered for a channel.
//!
//! Every notifier registered under a channel receives the message.
//! Individual notifier failures don't block the others.

use std::collections::HashMap;

use crate::traits::{Channel, DispatchResult, Message, Notifier};

/// Dispatches messages to notifiers, organized per channel.
#[derive(Default)]
pub struct Dispatcher {
    channels: HashMap<Channel, Vec<Box<dyn Notifier>>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a notifier to a channel.
    pub fn register(&mut self, channel: Channel, notifier: Box<dyn Notifier>) {
        self.channels.entry(channel).or_default().push(notifier);
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        self.channels
            .get(&channel)
            .is_some_and(|notifiers| !notifiers.is_empty())
    }

    /// Deliver a message to every notifier of a channel.
    ///
    /// Returns one result per notifier. An unconfigured channel yields an
    /// empty vector.
    pub async fn dispatch(&self, channel: Channel, message: &Message) -> Vec<DispatchResult> {
        let Some(notifiers) = self.channels.get(&channel) else {
            tracing::debug!(%channel, "No notifiers configured");
            return Vec::new();
        };

        let mut results = Vec::with_capacity(notifiers.len());

        for notifier in notifiers {
            let start = std::time::Instant::now();
            let result = notifier.send(message).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        %channel,
                        notifier = notifier.channel_name(),
                        duration_ms,
                        "Notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        %channel,
                        notifier = notifier.channel_name(),
                        error = %e,
                        duration_ms,
                        "Notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: notifier.channel_name().to_string(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NotifyError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    impl MockNotifier {
        fn boxed(name: &str, count: &Arc<AtomicUsize>, should_fail: bool) -> Box<dyn Notifier> {
            Box::new(MockNotifier {
                name: name.to_string(),
                send_count: count.clone(),
                should_fail,
            })
        }
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _message: &Message) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Config("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn message() -> Message {
        Message::text(vec!["+33600000000".to_string()], "test body")
    }

    #[tokio::test]
    async fn dispatch_to_all_notifiers() {
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::empty();
        dispatcher.register(Channel::Sms, MockNotifier::boxed("a", &count_a, false));
        dispatcher.register(Channel::Sms, MockNotifier::boxed("b", &count_b, false));

        let results = dispatcher.dispatch(Channel::Sms, &message()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_failure_doesnt_block() {
        let count = Arc::new(AtomicUsize::new(0));
        let unused = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::empty();
        dispatcher.register(Channel::Chat, MockNotifier::boxed("fail", &unused, true));
        dispatcher.register(Channel::Chat, MockNotifier::boxed("ok", &count, false));

        let results = dispatcher.dispatch(Channel::Chat, &message()).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("Configuration error: mock failure"));
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let sms = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::empty();
        dispatcher.register(Channel::Sms, MockNotifier::boxed("sms", &sms, false));

        assert!(dispatcher.has_channel(Channel::Sms));
        assert!(!dispatcher.has_channel(Channel::Chat));
        let results = dispatcher.dispatch(Channel::Chat, &message()).await;
        assert!(results.is_empty());
        assert_eq!(sms.load(Ordering::SeqCst), 0);
    }
}
