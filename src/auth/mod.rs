//! Sign-in and registration flows layered on the identity gateway.

pub mod admin;
pub mod landing;
pub mod register;

pub use admin::admin_sign_in;
pub use landing::landing_route;
pub use register::Registration;
