mod http;
mod native;
mod stub;

pub use http::{HttpTransport, InvalidEndpoint};
pub use native::{library_file_name, BindingError, NativeTransport};
pub use stub::{error_payload, status_payload, StubTransport};
