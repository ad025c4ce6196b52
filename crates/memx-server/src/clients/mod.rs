mod identity;
mod mailer;
mod payments;
mod storage;

pub use identity::IdentityClient;
pub use mailer::{Attachment, MailerClient};
pub use payments::PaymentsClient;
pub use storage::{is_default_object, object_key, StorageClient};
