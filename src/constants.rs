// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

// Token issuance
pub const DEFAULT_JWT_ISSUER: &str = "auth-gateway";
pub const DEFAULT_JWT_AUDIENCE: &str = "auth-gateway-clients";
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 3;
pub const REFRESH_TOKEN_BYTES: usize = 32;
pub const MAX_TOKEN_LENGTH: usize = 4096;

// Profile photos
pub const DEFAULT_PROFILE_PHOTO_URL: &str = "defaultURL";
pub const DEFAULT_PHOTO_CONTAINER: &str = "profilepictures";
pub const DEFAULT_OBJECT_STORE_ROOT: &str = "./blobs";
// Served by the gateway's own /blobs route
pub const DEFAULT_OBJECT_STORE_PUBLIC_URL: &str = "http://localhost:5000/blobs/";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_JSON_BODY_BYTES: u64 = 16 * 1024;

// Sign-in policy
pub const DEFAULT_LOCKOUT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT_MINUTES: i64 = 5;
pub const DEFAULT_MIN_AUTH_MILLIS: u64 = 100;
