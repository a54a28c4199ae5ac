//! Method routing for inbound calls.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::DispatchError;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Methods the desktop may call on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Lists every registered plugin.
    GetPlugins,
    /// Lists the background-eligible plugins.
    GetBackgroundPlugins,
    /// Connects a plugin.
    Init,
    /// Disconnects a plugin.
    Deinit,
    /// Invokes a method on a connected plugin.
    Execute,
}

impl Method {
    /// Parses a wire method name. Names are case-sensitive.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownMethod`] for any other name.
    pub fn parse(value: &str) -> Result<Self, DispatchError> {
        match value {
            "getPlugins" => Ok(Self::GetPlugins),
            "getBackgroundPlugins" => Ok(Self::GetBackgroundPlugins),
            "init" => Ok(Self::Init),
            "deinit" => Ok(Self::Deinit),
            "execute" => Ok(Self::Execute),
            _ => Err(DispatchError::unknown_method(value)),
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetPlugins => "getPlugins",
            Self::GetBackgroundPlugins => "getBackgroundPlugins",
            Self::Init => "init",
            Self::Deinit => "deinit",
            Self::Execute => "execute",
        }
    }

    /// Decodes this method's parameter object.
    ///
    /// Absent parameters decode as an empty object so that required fields
    /// are reported by name rather than as a type mismatch.
    pub(crate) fn params<T: DeserializeOwned>(
        self,
        params: Option<Value>,
    ) -> Result<T, DispatchError> {
        let params = params.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        serde_json::from_value(params)
            .map_err(|error| DispatchError::invalid_params(self.as_str(), error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::protocol::{ExecuteParams, LifecycleParams};

    #[rstest]
    #[case("getPlugins", Method::GetPlugins)]
    #[case("getBackgroundPlugins", Method::GetBackgroundPlugins)]
    #[case("init", Method::Init)]
    #[case("deinit", Method::Deinit)]
    #[case("execute", Method::Execute)]
    fn parses_known_methods(#[case] name: &str, #[case] expected: Method) {
        let method = Method::parse(name).expect("known method");
        assert_eq!(method, expected);
        assert_eq!(method.as_str(), name);
    }

    #[rstest]
    #[case::unknown("getPluginz")]
    #[case::wrong_case("GetPlugins")]
    #[case::empty("")]
    fn rejects_other_names(#[case] name: &str) {
        assert!(matches!(
            Method::parse(name),
            Err(DispatchError::UnknownMethod { method }) if method == name
        ));
    }

    #[test]
    fn missing_params_name_the_missing_field() {
        let error = Method::Init
            .params::<LifecycleParams>(None)
            .expect_err("plugin is required");
        let DispatchError::InvalidParams { method, message } = error else {
            panic!("expected invalid params");
        };
        assert_eq!(method, "init");
        assert!(message.contains("plugin"), "unexpected message: {message}");
    }

    #[test]
    fn execute_params_tolerate_extra_fields() {
        let params: ExecuteParams = Method::Execute
            .params(Some(json!({"api": "test", "method": "reverse", "extra": 1})))
            .expect("params");
        assert_eq!(params.api, "test");
        assert!(params.params.is_none());
    }
}
