//! Order plugin.

use std::sync::Arc;

use serde::Serialize;

use planloom_core::function::{
    FnFunction, FunctionArgs, FunctionMeta, InvocationError, ParameterSpec, Plugin, PluginFunction,
};
use planloom_core::value::Value;

pub struct OrderPlugins;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Order {
    id: i64,
    #[serde(rename = "CustomerID")]
    customer_id: i64,
    total_amount: f64,
    status: &'static str,
}

const RECENT_ORDER_IDS: [i64; 3] = [101, 102, 103];

fn find_order(id: i64) -> Option<Order> {
    let (customer_id, total_amount, status) = match id {
        101 => (7891, 251.88, "Shipped"),
        102 => (7892, 99.99, "Delivered"),
        103 => (7891, 199.99, "Pending"),
        _ => return None,
    };
    Some(Order {
        id,
        customer_id,
        total_amount,
        status,
    })
}

impl Plugin for OrderPlugins {
    fn name(&self) -> &str {
        "OrderPlugins"
    }

    fn functions(&self) -> Vec<Arc<dyn PluginFunction>> {
        vec![
            Arc::new(FnFunction::new(
                FunctionMeta::new("GetRecentOrderIds", "Get Recent order IDs"),
                |_args| async {
                    Ok(Value::List(
                        RECENT_ORDER_IDS.iter().map(|id| Value::from(*id)).collect(),
                    ))
                },
            )),
            Arc::new(FnFunction::new(
                FunctionMeta::new(
                    "GetOrderDetails",
                    "Get order details by order ID. Returns an object containing the order ID, \
                     associated customer ID (which represents a user ID), total amount, \
                     and order status.",
                )
                .with_parameter(ParameterSpec::required("id").with_description("order ID")),
                |args: FunctionArgs| async move {
                    let id = args.require_i64("id")?;
                    let order =
                        find_order(id).ok_or_else(|| InvocationError::failed("Order not found"))?;
                    Value::from_serializable(&order)
                        .map_err(|err| InvocationError::failed(err.to_string()))
                },
            )),
        ]
    }
}
