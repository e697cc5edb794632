//! Document plugin.
//!
//! Three sample documents: a privacy agreement, a service agreement and an
//! NDA. Lookups by an unknown id fail with "Document not found".

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use planloom_core::function::{
    FnFunction, FunctionArgs, FunctionContext, FunctionMeta, InvocationError, ParameterSpec,
    Plugin, PluginFunction,
};
use planloom_core::value::{Object, Value};

pub struct DocumentPlugins;

const NOT_FOUND: &str = "Document not found";

const DOCUMENT_NAMES: [(i64, &str); 3] = [
    (1, "Privacy Agreement"),
    (2, "Service Agreement"),
    (3, "Non-Disclosure Agreement (NDA)"),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Document {
    id: i64,
    created_by_id: i64,
    created_date_time_utc: &'static str,
    status: &'static str,
}

fn document_details(id: i64) -> Option<Document> {
    let (document_id, created_by_id, created, status) = match id {
        1 => (101, 7891, "2023-12-01T03:00:01Z", "Active"),
        2 => (102, 7892, "2024-05-15T11:12:00Z", "Inactive"),
        3 => (103, 7891, "2023-12-01T01:00:01Z", "Archived"),
        _ => return None,
    };
    Some(Document {
        id: document_id,
        created_by_id,
        created_date_time_utc: created,
        status,
    })
}

fn custom_fields(document_id: i64) -> Option<Vec<(&'static str, Value)>> {
    let fields = match document_id {
        1 => vec![
            ("Title", Value::from("Introduction to Machine Learning")),
            ("Author", Value::from("John Doe")),
            ("Purpose", Value::from("To educate readers about the basics of machine learning.")),
            (
                "Scope of Work",
                Value::from("Covers fundamental algorithms, techniques, and real-world applications."),
            ),
            (
                "Background",
                Value::from("Machine learning is a rapidly growing field in artificial intelligence."),
            ),
            (
                "Context",
                Value::from("Suitable for beginners and professionals looking to refresh their knowledge."),
            ),
        ],
        2 => vec![
            ("ProjectName", Value::from("AI Development Project")),
            ("Budget", Value::from(150_000)),
            ("Purpose", Value::from("To develop advanced AI capabilities for client solutions.")),
            (
                "Scope of Work",
                Value::from("Includes design, development, testing, and deployment of AI systems."),
            ),
            (
                "Background",
                Value::from("Client requires advanced AI solutions to stay competitive."),
            ),
            (
                "Context",
                Value::from("Project spans multiple departments and requires coordinated efforts."),
            ),
        ],
        3 => vec![
            ("ReportTitle", Value::from("Market Analysis Q1 2023")),
            ("Findings", Value::from("Increased market share in tech sector.")),
            ("Recommendations", Value::from("Invest in emerging technologies.")),
            (
                "Purpose",
                Value::from("To provide insights on market trends and company performance."),
            ),
            (
                "Scope of Work",
                Value::from("Analyzes market data, competitor performance, and economic indicators."),
            ),
            ("Background", Value::from("Quarterly market analysis to inform strategic decisions.")),
            (
                "Context",
                Value::from("Report is used by senior management for planning and investment."),
            ),
        ],
        _ => return None,
    };
    Some(fields)
}

const PRIVACY_AGREEMENT: &str = "Privacy Agreement
=================

1. Purpose
-----------
This Privacy Agreement outlines our commitment to protecting the privacy of our users. It details how we collect, use, and safeguard personal information.

2. Background
-------------
Our company is dedicated to maintaining the confidentiality of personal data. This agreement is in accordance with applicable data protection laws and regulations.

3. Scope of Work
----------------
This agreement applies to all personal data collected through our services, including names, addresses, email addresses, and payment information. It covers how data is processed, stored, and protected.

4. Context
----------
This Privacy Agreement is relevant to all users of our services, including website visitors, customers, and business partners.

5. Data Collection
------------------
We collect personal information directly from users through forms, surveys, and account registrations. We may also collect data through automated means, such as cookies and web beacons.

6. Data Use
-----------
Personal data is used to provide and improve our services, communicate with users, process transactions, and comply with legal obligations.

7. Data Protection
------------------
We implement a variety of security measures to ensure the protection of personal data. Access to personal information is restricted to authorized personnel only.

8. User Rights
--------------
Users have the right to access, correct, or delete their personal information. They can also object to or restrict certain data processing activities.

9. Changes to This Agreement
----------------------------
We may update this Privacy Agreement periodically. Users will be notified of any significant changes through our website or direct communication.

10. Contact Information
-----------------------
For questions or concerns about this Privacy Agreement, please contact our Legal Team at legal@example.com.";

const SERVICE_AGREEMENT: &str = "Service Agreement
=================

1. Purpose
-----------
This Service Agreement sets forth the terms and conditions under which we will provide services to the client.

2. Background
-------------
This agreement is designed to formalize the relationship between our company and the client, ensuring a clear understanding of the roles and responsibilities of each party.

3. Scope of Work
----------------
The services to be provided under this agreement include design, development, testing, and deployment of software solutions. Detailed specifications are outlined in the attached project plan.

4. Context
----------
This agreement is relevant to all projects undertaken by our company for the client and includes specific terms for deliverables, timelines, and payment schedules.

5. Deliverables
--------------
The key deliverables under this agreement include completed software applications, user documentation, and training materials.

6. Timelines
------------
Project milestones and deadlines are outlined in the project plan. Any changes to the schedule must be agreed upon by both parties in writing.

7. Payment Terms
---------------
The total project cost is $150,000, payable in installments as follows: $50,000 upon signing, $50,000 upon completion of development, and $50,000 upon final delivery.

8. Confidentiality
------------------
Both parties agree to maintain the confidentiality of proprietary information disclosed during the course of the project.

9. Liability
------------
Our company's liability for any damages arising from this agreement is limited to the total amount paid by the client.

10. Termination
---------------
This agreement may be terminated by either party with 30 days' written notice. In the event of termination, the client will pay for all services rendered up to the termination date.";

const NON_DISCLOSURE_AGREEMENT: &str = "Non-Disclosure Agreement (NDA)
=============================

1. Purpose
-----------
This Non-Disclosure Agreement (NDA) is intended to protect confidential information exchanged between the parties.

2. Background
-------------
The parties wish to explore a potential business relationship, during which they may disclose confidential information to each other.

3. Scope of Work
----------------
This agreement covers all confidential information, including business plans, financial data, technical information, and trade secrets, disclosed by one party to the other.

4. Context
----------
This NDA is applicable to all discussions and documents exchanged between the parties during their collaboration.

5. Definition of Confidential Information
----------------------------------------
Confidential information includes all non-public information, whether written or oral, that is designated as confidential or that reasonably should be understood to be confidential.

6. Obligations of Receiving Party
---------------------------------
The receiving party agrees to use the confidential information solely for the purpose of evaluating the potential business relationship and to take reasonable measures to protect its confidentiality.

7. Exclusions from Confidential Information
-------------------------------------------
Confidential information does not include information that is already known to the receiving party, becomes publicly available through no fault of the receiving party, or is independently developed by the receiving party.

8. Duration
-----------
This NDA is effective as of the date signed by both parties and remains in effect for three years from the date of disclosure of the confidential information.

9. Governing Law
----------------
This agreement is governed by the laws of the jurisdiction in which the disclosing party is located.

10. Signatures
-------------
This NDA is executed by the duly authorized representatives of the parties as of the dates set forth below.

Disclosing Party: _______________________
Receiving Party: _______________________
Date: _________________________________";

fn document_contents(document_id: i64) -> Option<&'static str> {
    match document_id {
        1 => Some(PRIVACY_AGREEMENT),
        2 => Some(SERVICE_AGREEMENT),
        3 => Some(NON_DISCLOSURE_AGREEMENT),
        _ => None,
    }
}

/// Case-insensitive substring search over document names.
struct SearchDocumentNames;

#[async_trait]
impl PluginFunction for SearchDocumentNames {
    fn name(&self) -> &str {
        "SearchDocumentNames"
    }

    fn description(&self) -> &str {
        "Search for document names and return the corresponding document IDs."
    }

    fn metadata(&self) -> FunctionMeta {
        FunctionMeta::new(self.name(), self.description()).with_parameter(
            ParameterSpec::required("searchQuery")
                .with_description("text to look for in document names"),
        )
    }

    async fn invoke(
        &self,
        args: FunctionArgs,
        ctx: FunctionContext,
    ) -> Result<Value, InvocationError> {
        let query = args.require_str("searchQuery")?.to_lowercase();
        let ids: Vec<Value> = DOCUMENT_NAMES
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&query))
            .map(|(id, _)| Value::from(*id))
            .collect();
        tracing::debug!(
            execution_id = %ctx.execution_id,
            query = %query,
            matches = ids.len(),
            "document names searched"
        );
        Ok(Value::List(ids))
    }
}

/// Full text of a document.
struct GetDocumentContents;

#[async_trait]
impl PluginFunction for GetDocumentContents {
    fn name(&self) -> &str {
        "GetDocumentContents"
    }

    fn description(&self) -> &str {
        "Get document contents by document ID. \
         Returns the full content of the document as a string."
    }

    fn metadata(&self) -> FunctionMeta {
        FunctionMeta::new(self.name(), self.description())
            .with_parameter(ParameterSpec::required("documentId").with_description("document ID"))
    }

    async fn invoke(
        &self,
        args: FunctionArgs,
        ctx: FunctionContext,
    ) -> Result<Value, InvocationError> {
        if ctx.is_cancelled() {
            return Err(InvocationError::failed("cancelled"));
        }
        let document_id = args.require_i64("documentId")?;
        document_contents(document_id)
            .map(Value::from)
            .ok_or_else(|| InvocationError::failed(NOT_FOUND))
    }
}

impl Plugin for DocumentPlugins {
    fn name(&self) -> &str {
        "DocumentPlugins"
    }

    fn functions(&self) -> Vec<Arc<dyn PluginFunction>> {
        vec![
            Arc::new(FnFunction::new(
                FunctionMeta::new(
                    "GetRecentModifiedDocumentIds",
                    "Get recent modified document IDs",
                ),
                |_args| async {
                    Ok(Value::List(
                        DOCUMENT_NAMES.iter().map(|(id, _)| Value::from(*id)).collect(),
                    ))
                },
            )),
            Arc::new(FnFunction::new(
                FunctionMeta::new(
                    "GetDocumentDetails",
                    "Get document details by document ID. Returns an object containing the \
                     document ID, created by, created date, and status.",
                )
                .with_parameter(ParameterSpec::required("id").with_description("document ID")),
                |args: FunctionArgs| async move {
                    let id = args.require_i64("id")?;
                    let document =
                        document_details(id).ok_or_else(|| InvocationError::failed(NOT_FOUND))?;
                    Value::from_serializable(&document)
                        .map_err(|err| InvocationError::failed(err.to_string()))
                },
            )),
            Arc::new(FnFunction::new(
                FunctionMeta::new(
                    "GetCustomFieldNames",
                    "Get custom field names for a document by document ID. \
                     Returns a list of field names.",
                )
                .with_parameter(
                    ParameterSpec::required("documentId").with_description("document ID"),
                ),
                |args: FunctionArgs| async move {
                    let document_id = args.require_i64("documentId")?;
                    let fields = custom_fields(document_id)
                        .ok_or_else(|| InvocationError::failed(NOT_FOUND))?;
                    Ok(Value::List(
                        fields.into_iter().map(|(name, _)| Value::from(name)).collect(),
                    ))
                },
            )),
            Arc::new(FnFunction::new(
                FunctionMeta::new(
                    "GetCustomFieldValues",
                    "Get custom field values for a document by document ID and field name. \
                     Returns the value stored under that field name.",
                )
                .with_parameter(
                    ParameterSpec::required("documentId").with_description("document ID"),
                )
                .with_parameter(
                    ParameterSpec::required("fieldName").with_description("custom field name"),
                ),
                |args: FunctionArgs| async move {
                    let document_id = args.require_i64("documentId")?;
                    let field_name = args.require_str("fieldName")?;
                    let fields: Object = custom_fields(document_id)
                        .ok_or_else(|| InvocationError::failed(NOT_FOUND))?
                        .into_iter()
                        .map(|(name, value)| (name.to_string(), value))
                        .collect();
                    fields.get(field_name).cloned().ok_or_else(|| {
                        InvocationError::invalid_argument(
                            "fieldName",
                            format!("no field named '{}'", field_name),
                        )
                    })
                },
            )),
            Arc::new(SearchDocumentNames),
            Arc::new(GetDocumentContents),
        ]
    }
}
