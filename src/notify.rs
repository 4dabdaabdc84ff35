use crate::types::MessageRef;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::info;

/// Canal que entrega e edita mensagens de status.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, text: &str, image: Option<&[u8]>) -> Result<MessageRef>;
    async fn edit(&self, message: MessageRef, text: &str, image: Option<&[u8]>) -> Result<()>;
}

/// Canal que apenas registra as mensagens no log.
#[derive(Debug, Default)]
pub struct LogChannel {
    last_id: AtomicI64,
}

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, text: &str, image: Option<&[u8]>) -> Result<MessageRef> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "[NOTIFICACAO #{}] (imagem: {} bytes)\n{}",
            id,
            image.map_or(0, <[u8]>::len),
            text
        );
        Ok(MessageRef(id))
    }

    async fn edit(&self, message: MessageRef, text: &str, image: Option<&[u8]>) -> Result<()> {
        info!(
            "[NOTIFICACAO #{} editada] (imagem: {} bytes)\n{}",
            message.0,
            image.map_or(0, <[u8]>::len),
            text
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;

    /// Canal de teste que guarda tudo o que foi enviado/editado.
    #[derive(Default)]
    pub(crate) struct RecordingChannel {
        pub sent: Mutex<Vec<(String, bool)>>,
        pub edits: Mutex<Vec<(MessageRef, String)>>,
        pub fail: AtomicBool,
        next: AtomicI64,
    }

    impl RecordingChannel {
        pub fn sent_texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }

        pub fn edits(&self) -> Vec<(MessageRef, String)> {
            self.edits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn send(&self, text: &str, image: Option<&[u8]>) -> Result<MessageRef> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("canal indisponível");
            }
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), image.is_some()));
            Ok(MessageRef(self.next.fetch_add(1, Ordering::SeqCst) + 100))
        }

        async fn edit(&self, message: MessageRef, text: &str, _image: Option<&[u8]>) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("canal indisponível");
            }
            self.edits.lock().unwrap().push((message, text.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_channel_hands_out_sequential_refs() {
        let channel = LogChannel::default();
        assert_eq!(channel.send("a", None).await.unwrap(), MessageRef(1));
        assert_eq!(channel.send("b", Some(&[1, 2])).await.unwrap(), MessageRef(2));
        assert!(channel.edit(MessageRef(1), "c", None).await.is_ok());
    }
}
