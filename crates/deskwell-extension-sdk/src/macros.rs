//! Macros for extension authors.

/// Derive the stable fully-qualified implementation id for a type.
///
/// Expands to a `&'static str` of the form `"my_crate::panel::WeatherPanel"`,
/// evaluated at the invocation site so the module path is the author's own.
///
/// # Example
///
/// ```rust
/// use deskwell_extension_sdk::prelude::*;
///
/// #[derive(Default)]
/// struct WeatherPanel;
///
/// impl WeatherPanel {
///     fn id() -> &'static str {
///         deskwell_extension_sdk::impl_id!(WeatherPanel)
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_id {
    ($ty:ty) => {
        concat!(module_path!(), "::", stringify!($ty))
    };
}

/// Generate the FFI exports for an extension dynamic library.
///
/// The type must implement [`ExtensionUnit`](crate::ExtensionUnit) and
/// [`Default`]; the `Default` impl is the zero-argument constructor the
/// loader invokes.
///
/// # Example
///
/// ```rust,no_run
/// use deskwell_extension_sdk::prelude::*;
///
/// #[derive(Default)]
/// struct WeatherPanel {
///     descriptor: ExtensionDescriptor,
/// }
///
/// impl ExtensionUnit for WeatherPanel {
///     fn descriptor(&self) -> &ExtensionDescriptor {
///         &self.descriptor
///     }
///
///     fn impl_id(&self) -> &str {
///         deskwell_extension_sdk::impl_id!(WeatherPanel)
///     }
/// }
///
/// deskwell_extension_sdk::declare_extension!(WeatherPanel);
/// ```
#[macro_export]
macro_rules! declare_extension {
    ($ty:ty) => {
        #[no_mangle]
        pub extern "C" fn deskwell_extension_abi_version() -> u32 {
            $crate::ABI_VERSION
        }

        #[no_mangle]
        pub extern "C" fn deskwell_extension_create() -> *mut $crate::BoxedExtension {
            let unit: $crate::BoxedExtension = Box::new(<$ty as Default>::default());
            Box::into_raw(Box::new(unit))
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::descriptor::ExtensionDescriptor;
    use crate::types::ExtensionUnit;

    #[derive(Default)]
    struct Declared {
        descriptor: ExtensionDescriptor,
    }

    impl ExtensionUnit for Declared {
        fn descriptor(&self) -> &ExtensionDescriptor {
            &self.descriptor
        }

        fn impl_id(&self) -> &str {
            crate::impl_id!(Declared)
        }
    }

    crate::declare_extension!(Declared);

    #[test]
    fn test_declared_exports() {
        assert_eq!(deskwell_extension_abi_version(), crate::ABI_VERSION);

        let raw = deskwell_extension_create();
        assert!(!raw.is_null());
        let unit = unsafe { *Box::from_raw(raw) };
        assert_eq!(
            unit.impl_id(),
            "deskwell_extension_sdk::macros::tests::Declared"
        );
    }

    #[test]
    fn test_impl_id_uses_module_path() {
        let id = crate::impl_id!(Declared);
        assert!(id.ends_with("::Declared"));
        assert!(id.starts_with("deskwell_extension_sdk::"));
    }
}
