//! Business logic and third-party integrations.
//!
//! # Services
//!
//! - `auth` - Password accounts, one-time codes, bearer tokens, Google sign-in
//! - `email` - Transactional and marketing mail over SMTP
//! - `marketing` - Subscriber notifications and campaigns
//! - `media` - Image uploads (Cloudinary or local disk)
//! - `payments` - Stripe Checkout sessions
//! - `invoice` - PDF invoices
//! - `sales_chat` - Inventory-grounded AI sales assistant
//! - `whatsapp` - Admin alerts via Twilio

pub mod auth;
pub mod email;
pub mod invoice;
pub mod marketing;
pub mod media;
pub mod payments;
pub mod sales_chat;
pub mod whatsapp;

pub use auth::{AuthError, AuthService, GoogleOAuth, TokenKeys};
pub use email::{EmailError, EmailService};
pub use media::{MediaError, MediaFolder, MediaStore, Upload};
pub use payments::{PaymentError, PaymentService};
pub use sales_chat::{ChatError, SalesChat};
pub use whatsapp::{WhatsAppError, WhatsAppNotifier};
