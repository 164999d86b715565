//! API models for request and response payloads

pub mod band;
pub mod catalog;
pub mod membership;
pub mod post;
pub mod user;

pub use band::{BandResponse, BandRow, CreateBandRequest, MemberResponse, UpdateBandRequest};
pub use catalog::{
    Instrument, InstrumentCategory, InstrumentCategoryPayload, InstrumentPayload, Tag, TagPayload,
};
pub use membership::{InstrumentChoice, InviteResponse, JoinRequestResponse};
pub use post::{
    BookmarkResponse, CreatePostRequest, PostResponse, PostRow, ReviewRequest, ReviewResponse,
    ReviewRow, UpdatePostRequest,
};
pub use user::{
    CreateUserRequest, FollowResponse, LoginRequest, TokenResponse, UpdateUserRequest, User,
    UserResponse,
};
