use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Agent events a guard hook can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
    UserPromptSubmit,
}

impl HookEvent {
    /// Parse an event name (case-insensitive, kebab/snake/Pascal).
    pub fn from_arg(s: &str) -> Option<HookEvent> {
        match s.to_lowercase().as_str() {
            "pretooluse" | "pre-tool-use" | "pre_tool_use" => Some(HookEvent::PreToolUse),
            "posttooluse" | "post-tool-use" | "post_tool_use" => Some(HookEvent::PostToolUse),
            "userpromptsubmit" | "user-prompt-submit" | "user_prompt_submit" => {
                Some(HookEvent::UserPromptSubmit)
            }
            _ => None,
        }
    }
}

/// The guard hooks shipped by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    CheckDependencies,
    ValidateImports,
    TypecheckAfterEdit,
    LintAfterEdit,
    FormatOnEdit,
}

impl HookName {
    pub const ALL: [HookName; 5] = [
        HookName::CheckDependencies,
        HookName::ValidateImports,
        HookName::TypecheckAfterEdit,
        HookName::LintAfterEdit,
        HookName::FormatOnEdit,
    ];

    pub fn from_arg(s: &str) -> Option<HookName> {
        match s.to_lowercase().as_str() {
            "check-dependencies" | "check_dependencies" | "checkdependencies" => {
                Some(HookName::CheckDependencies)
            }
            "validate-imports" | "validate_imports" | "validateimports" => {
                Some(HookName::ValidateImports)
            }
            "typecheck-after-edit" | "typecheck_after_edit" | "typecheckafteredit" | "typecheck" => {
                Some(HookName::TypecheckAfterEdit)
            }
            "lint-after-edit" | "lint_after_edit" | "lintafteredit" | "lint" => {
                Some(HookName::LintAfterEdit)
            }
            "format-on-edit" | "format_on_edit" | "formatonedit" | "format" => {
                Some(HookName::FormatOnEdit)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::CheckDependencies => "check-dependencies",
            HookName::ValidateImports => "validate-imports",
            HookName::TypecheckAfterEdit => "typecheck-after-edit",
            HookName::LintAfterEdit => "lint-after-edit",
            HookName::FormatOnEdit => "format-on-edit",
        }
    }
}

impl std::fmt::Display for HookName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool arguments the hooks look at. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolInput {
    pub file_path: Option<String>,
    pub content: Option<String>,
    pub new_string: Option<String>,
    pub command: Option<String>,
}

/// One tool invocation by the agent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolUse {
    #[serde(default, alias = "toolName")]
    pub tool_name: String,
    #[serde(default, alias = "toolInput")]
    pub tool_input: Option<ToolInput>,
}

impl ToolUse {
    pub fn is_edit_or_write(&self) -> bool {
        self.tool_name == "Edit" || self.tool_name == "Write"
    }

    pub fn is_bash(&self) -> bool {
        self.tool_name == "Bash"
    }

    pub fn file_path(&self) -> &str {
        self.tool_input
            .as_ref()
            .and_then(|ti| ti.file_path.as_deref())
            .unwrap_or("")
    }

    /// The text the edit introduces: `new_string` for Edit, `content` for Write.
    pub fn edited_content(&self) -> &str {
        let Some(ti) = self.tool_input.as_ref() else {
            return "";
        };
        match self.tool_name.as_str() {
            "Edit" => ti.new_string.as_deref().unwrap_or(""),
            "Write" => ti.content.as_deref().unwrap_or(""),
            _ => "",
        }
    }

    pub fn command(&self) -> &str {
        self.tool_input
            .as_ref()
            .and_then(|ti| ti.command.as_deref())
            .unwrap_or("")
    }
}

/// JSON received on stdin.
///
/// Accepts the single tool-use form (`event`/`toolName`/`toolInput`, with
/// snake_case aliases) and the batch form (`prompt` + `tool_uses`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookInput {
    #[serde(default, alias = "hook_event_name", alias = "hookEventName")]
    pub event: Option<String>,
    #[serde(default, rename = "toolName", alias = "tool_name")]
    pub tool_name: Option<String>,
    #[serde(default, rename = "toolInput", alias = "tool_input")]
    pub tool_input: Option<ToolInput>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "toolUses")]
    pub tool_uses: Option<Vec<ToolUse>>,
}

impl HookInput {
    /// Parsed event, `None` when absent or unrecognized.
    pub fn event_kind(&self) -> Option<HookEvent> {
        self.event.as_deref().and_then(HookEvent::from_arg)
    }

    /// True when no event was given, or the given event is `event`.
    pub fn event_is_or_absent(&self, event: HookEvent) -> bool {
        match self.event.as_deref() {
            None => true,
            Some(_) => self.event_kind() == Some(event),
        }
    }

    /// All tool uses, normalized across the single and batch input forms.
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        if let Some(name) = &self.tool_name {
            return vec![ToolUse {
                tool_name: name.clone(),
                tool_input: self.tool_input.clone(),
            }];
        }
        self.tool_uses.clone().unwrap_or_default()
    }

    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Blocked,
}

/// The verdict printed on stdout: `{"status", "message"?, "details"?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Verdict {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: None,
            details: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            status: Status::Blocked,
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.status == Status::Blocked
    }

    /// Process exit code: 0 = allow, 1 = block.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            Status::Ok => 0,
            Status::Blocked => 1,
        }
    }

    /// Serialized verdict and exit code, ready for the CLI.
    pub fn render(&self) -> (String, i32) {
        let json = serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":"ok"}"#.to_string());
        (json, self.exit_code())
    }
}
