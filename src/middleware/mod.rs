pub mod current_user;
pub mod request_id;

pub use current_user::{CurrentUser, MaybeUser, USER_ID_HEADER};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId};
