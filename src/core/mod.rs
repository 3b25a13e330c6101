//! Request-level services

pub mod gateway;

pub use gateway::{
    CredentialGateway, EditProfileRequest, GatewaySettings, PhotoUpload, RegisterRequest,
};
