use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Tool call type OpenAI-format servers emit today
pub const FUNCTION_TYPE: &str = "function";

/// One streamed fragment of a tool call.
///
/// Only `index` is guaranteed; the first fragment for an index usually
/// carries `id`, `type` and the function name, later ones only append to
/// `function.arguments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCallDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    /// Opening fragment announcing a call's id and function name
    pub fn start(index: u32, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            r#type: Some(FUNCTION_TYPE.to_string()),
            function: Some(FunctionCallDelta {
                name: Some(name.into()),
                arguments: Some(String::new()),
            }),
        }
    }

    /// Fragment carrying only more argument text
    pub fn arguments(index: u32, arguments: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            r#type: None,
            function: Some(FunctionCallDelta {
                name: None,
                arguments: Some(arguments.into()),
            }),
        }
    }

    /// Lift a legacy top-level `function_call` fragment into the tool call model.
    ///
    /// The legacy API only ever streamed a single call, so it always sits at
    /// index 0.
    pub fn from_legacy_function_call(function: FunctionCallDelta) -> Self {
        Self {
            index: 0,
            id: None,
            r#type: Some(FUNCTION_TYPE.to_string()),
            function: Some(function),
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        self.function.as_ref().and_then(|f| f.name.as_deref())
    }

    pub fn function_arguments(&self) -> Option<&str> {
        self.function.as_ref().and_then(|f| f.arguments.as_deref())
    }
}

/// A fully assembled tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub r#type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments as the raw JSON text the model produced
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            r#type: FUNCTION_TYPE.to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Parse the argument text into a typed value.
    ///
    /// Models may stream an empty string for argument-less functions, which is
    /// treated as `{}`.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let raw = self.function.arguments.trim();
        serde_json::from_str(if raw.is_empty() { "{}" } else { raw })
    }
}
