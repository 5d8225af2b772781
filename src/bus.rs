//! In-memory message channel between named actors.
//!
//! Each actor owns one bounded mailbox. Delivery is point-to-point through a
//! tokio `mpsc` queue, so messages from one sender to one receiver keep their
//! order; nothing is promised across senders. A send that cannot complete
//! within the configured timeout is reported as an error and the message is
//! gone; callers decide whether that matters.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use crate::error::AppError;
use crate::models::message::{ActorId, Envelope, Message};

pub struct Bus {
    mailboxes: DashMap<ActorId, mpsc::Sender<Envelope>>,
    mailbox_size: usize,
    send_timeout: Duration,
    delivered_tx: broadcast::Sender<Envelope>,
}

impl Bus {
    pub fn new(mailbox_size: usize, send_timeout: Duration, tap_buffer_size: usize) -> Self {
        let (delivered_tx, _unused_rx) = broadcast::channel(tap_buffer_size.max(1));

        Self {
            mailboxes: DashMap::new(),
            mailbox_size: mailbox_size.max(1),
            send_timeout,
            delivered_tx,
        }
    }

    pub fn register(&self, id: ActorId) -> Result<Mailbox, AppError> {
        use dashmap::mapref::entry::Entry;

        match self.mailboxes.entry(id.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateActor(id.to_string())),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(self.mailbox_size);
                slot.insert(tx);
                Ok(Mailbox { id, rx })
            }
        }
    }

    pub fn deregister(&self, id: &ActorId) {
        self.mailboxes.remove(id);
    }

    pub fn is_registered(&self, id: &ActorId) -> bool {
        self.mailboxes.contains_key(id)
    }

    pub async fn send(
        &self,
        from: &ActorId,
        to: &ActorId,
        message: Message,
    ) -> Result<(), AppError> {
        // Clone the sender out so no map guard is held across the await.
        let tx = self
            .mailboxes
            .get(to)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::UnknownActor(to.to_string()))?;

        let envelope = Envelope::new(from.clone(), to.clone(), message);

        tx.send_timeout(envelope.clone(), self.send_timeout)
            .await
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => AppError::MailboxFull(to.to_string()),
                SendTimeoutError::Closed(_) => AppError::MailboxClosed(to.to_string()),
            })?;

        let _ = self.delivered_tx.send(envelope);
        Ok(())
    }

    /// Every envelope delivered from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.delivered_tx.subscribe()
    }
}

pub struct Mailbox {
    id: ActorId,
    rx: mpsc::Receiver<Envelope>,
}

impl Mailbox {
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Next envelope, or `None` once `wait` has elapsed.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Option<Envelope> {
        match timeout(wait, self.rx.recv()).await {
            Ok(Some(envelope)) => Some(envelope),
            Ok(None) => {
                // Deregistered: behave like a silent wait instead of spinning.
                tokio::time::sleep(wait).await;
                None
            }
            Err(_elapsed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Bus;
    use crate::error::AppError;
    use crate::models::message::{ActorId, Message};
    use crate::models::position::Position;

    fn bus() -> Bus {
        Bus::new(4, Duration::from_millis(50), 64)
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_in_send_order() {
        let bus = bus();
        let taxi = ActorId::from("taxi1");
        let passenger = ActorId::from("passenger1");
        let mut mailbox = bus.register(passenger.clone()).unwrap();

        for eta in 1..=3 {
            let bid = Message::Bid {
                eta,
                position: Position::new(0, 0),
            };
            bus.send(&taxi, &passenger, bid).await.unwrap();
        }

        for expected in 1..=3 {
            let envelope = mailbox.recv_timeout(Duration::from_secs(1)).await.unwrap();
            assert_eq!(envelope.sender, taxi);
            assert_eq!(
                envelope.message,
                Message::Bid {
                    eta: expected,
                    position: Position::new(0, 0)
                }
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recv_times_out_when_idle() {
        let bus = bus();
        let mut mailbox = bus.register(ActorId::from("taxi1")).unwrap();
        assert!(mailbox.recv_timeout(Duration::from_secs(10)).await.is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let bus = bus();
        let _first = bus.register(ActorId::from("taxi1")).unwrap();
        let second = bus.register(ActorId::from("taxi1"));
        assert!(matches!(second, Err(AppError::DuplicateActor(_))));
    }

    #[tokio::test]
    async fn sending_to_unknown_actor_fails() {
        let bus = bus();
        let result = bus
            .send(&ActorId::from("passenger1"), &ActorId::from("ghost"), Message::Reject)
            .await;
        assert!(matches!(result, Err(AppError::UnknownActor(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn full_mailbox_drops_after_timeout() {
        let bus = Bus::new(1, Duration::from_millis(50), 64);
        let to = ActorId::from("taxi1");
        let from = ActorId::from("passenger1");
        let _mailbox = bus.register(to.clone()).unwrap();

        bus.send(&from, &to, Message::Reject).await.unwrap();
        let overflow = bus.send(&from, &to, Message::Reject).await;
        assert!(matches!(overflow, Err(AppError::MailboxFull(_))));
    }

    #[tokio::test]
    async fn tap_sees_delivered_envelopes() {
        let bus = bus();
        let mut tap = bus.subscribe();
        let to = ActorId::from("taxi1");
        let _mailbox = bus.register(to.clone()).unwrap();

        bus.send(&ActorId::from("passenger1"), &to, Message::Reject)
            .await
            .unwrap();

        let seen = tap.recv().await.unwrap();
        assert_eq!(seen.recipient, to);
        assert_eq!(seen.message, Message::Reject);
    }

    #[tokio::test]
    async fn deregistered_actor_is_unreachable() {
        let bus = bus();
        let id = ActorId::from("taxi1");
        let _mailbox = bus.register(id.clone()).unwrap();
        assert!(bus.is_registered(&id));

        bus.deregister(&id);
        assert!(!bus.is_registered(&id));
    }
}
