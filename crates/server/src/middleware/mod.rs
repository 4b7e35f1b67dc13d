pub mod caller;
pub mod request_id;

pub use caller::{CallerIdentity, USER_ID_HEADER, caller_middleware};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
