use std::io;

use http::StatusCode;

use super::Error;

pub(super) fn status_code(error: &Error) -> StatusCode {
	match error {
		| Error::BadRequest(..) | Error::Arithmetic(..) => StatusCode::BAD_REQUEST,
		| Error::Unauthorized(..) => StatusCode::UNAUTHORIZED,
		| Error::Forbidden(..) | Error::FeatureDisabled(..) => StatusCode::FORBIDDEN,
		| Error::NotFound(..) => StatusCode::NOT_FOUND,
		| Error::Conflict(..) => StatusCode::CONFLICT,
		| Error::RateLimited(..) => StatusCode::TOO_MANY_REQUESTS,
		| Error::Transient(..) => StatusCode::SERVICE_UNAVAILABLE,
		| Error::Io(error) => io_error_code(error.kind()),
		| _ => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

pub(super) fn io_error_code(kind: io::ErrorKind) -> StatusCode {
	use io::ErrorKind;

	match kind {
		| ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
		| ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
		| ErrorKind::NotFound => StatusCode::NOT_FOUND,
		| ErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
		| _ => StatusCode::INTERNAL_SERVER_ERROR,
	}
}
