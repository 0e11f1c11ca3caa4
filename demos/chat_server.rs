//! Chat server with a stand-in generator
//!
//! Serves `chat` and `screenAnalysis` on ws://127.0.0.1:3000/rpc. Replies
//! echo the prompt and describe the attached images, which is enough to
//! drive the front-end without a model behind it.
//!
//! ```bash
//! cargo run --example chat_server
//! ```

use async_trait::async_trait;
use parley::server::{Attachment, BoxError, Generator};
use parley::ParleyServer;

struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str, attachments: Vec<Attachment>) -> Result<String, BoxError> {
        if attachments.is_empty() {
            return Ok(format!("You said: {}", prompt));
        }
        let described: Vec<String> = attachments
            .iter()
            .map(|a| format!("{} ({} bytes)", a.mime_type, a.bytes.len()))
            .collect();
        Ok(format!("You said: {} | images: {}", prompt, described.join(", ")))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    parley::core::init_logging("info")?;

    let server = ParleyServer::builder()
        .bind_str("127.0.0.1:3000")?
        .with_generator(EchoGenerator)
        .build()
        .await?;

    println!("Chat server on ws://{}{}", server.local_addr()?, server.path());
    server.run().await?;
    Ok(())
}
