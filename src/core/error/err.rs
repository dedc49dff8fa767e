#[macro_export]
macro_rules! Err {
	($($args:tt)*) => {
		Err($crate::err!($($args)*))
	};
}

#[macro_export]
macro_rules! err {
	(error!($($args:tt)+)) => {{
		$crate::error!($($args)+);
		$crate::error::Error::Err(std::format!($($args)+).into())
	}};

	(debug_error!($($args:tt)+)) => {{
		$crate::debug_error!($($args)+);
		$crate::error::Error::Err(std::format!($($args)+).into())
	}};

	($variant:ident(error!($($args:tt)+))) => {{
		$crate::error!($($args)+);
		$crate::error::Error::$variant(std::format!($($args)+).into())
	}};

	($variant:ident(debug_error!($($args:tt)+))) => {{
		$crate::debug_error!($($args)+);
		$crate::error::Error::$variant(std::format!($($args)+).into())
	}};

	(Config($item:literal, $($args:tt)+)) => {{
		$crate::error!(config = %$item, $($args)+);
		$crate::error::Error::Config($item, std::format!($($args)+).into())
	}};

	($variant:ident($($args:tt)+)) => {
		$crate::error::Error::$variant(std::format!($($args)+).into())
	};

	($string:literal $($args:tt)*) => {
		$crate::error::Error::Err(std::format!($string $($args)*).into())
	};
}
