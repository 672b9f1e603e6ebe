//! Domain models for the API.
//!
//! These are the shapes handlers work with and serialize. Database row types
//! live next to their queries in [`crate::db`].

pub mod content;
pub mod order;
pub mod product;
pub mod user;

pub use content::{
    Article, ArticlePage, Banner, ChatLog, CmsContent, DiscountBanner, Subscriber, slugify,
};
pub use order::{
    AdminOrder, CartItem, Coupon, DailyOrders, Order, OrderCustomer, OrderItem, ShippingAddress,
    TrackingInfo,
};
pub use product::{
    Product, ProductDraft, ProductView, Review, Testimonial, TestimonialSort, TopProduct,
};
pub use user::{CodeCheck, OneTimeCode, User, UserProfile, UserStats};
