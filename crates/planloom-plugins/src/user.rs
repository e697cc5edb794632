//! User lookup plugin.

use std::sync::Arc;

use planloom_core::function::{
    FnFunction, FunctionArgs, FunctionMeta, InvocationError, ParameterSpec, Plugin, PluginFunction,
};
use planloom_core::value::Value;

pub struct UserPlugins;

fn user_name(id: i64) -> Option<&'static str> {
    match id {
        7891 => Some("Alex Johnson"),
        7892 => Some("Sophia Lee"),
        _ => None,
    }
}

impl Plugin for UserPlugins {
    fn name(&self) -> &str {
        "UserPlugins"
    }

    fn functions(&self) -> Vec<Arc<dyn PluginFunction>> {
        vec![Arc::new(FnFunction::new(
            FunctionMeta::new("GetUserNameById", "Get user name by a user ID")
                .with_parameter(ParameterSpec::required("id").with_description("user ID")),
            |args: FunctionArgs| async move {
                let id = args.require_i64("id")?;
                user_name(id)
                    .map(Value::from)
                    .ok_or_else(|| InvocationError::failed("User not found"))
            },
        ))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planloom_core::function::FunctionContext;
    use planloom_core::value::object;

    #[test]
    fn test_get_user_name_by_id() {
        tokio_test::block_on(async {
            let functions = UserPlugins.functions();
            let lookup = &functions[0];
            let name = lookup
                .invoke(
                    FunctionArgs::new(object([("id", 7892)])),
                    FunctionContext::detached("UserPlugins-GetUserNameById"),
                )
                .await
                .expect("name");
            assert_eq!(name, Value::from("Sophia Lee"));

            let err = lookup
                .invoke(
                    FunctionArgs::new(object([("id", 1)])),
                    FunctionContext::detached("UserPlugins-GetUserNameById"),
                )
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "User not found");
        });
    }
}
