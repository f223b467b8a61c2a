use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::ResponseInfo;

/// Response delivery path for command output.
///
/// Implementors carry whatever context they need to deliver (a chat client,
/// a console, a test buffer), so the function and the object it is bound to
/// travel together.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Deliver one response to the recipient described by `res_info`
    async fn respond(&self, res_info: &ResponseInfo, text: &str) -> Result<(), BotError>;
}
