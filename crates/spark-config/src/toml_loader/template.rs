//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# spark configuration
# Only override what you want to change -- missing fields use defaults.

[credentials]
# Issued by the service console. Run `spark --setup` to fill these in.
app_id = ""
api_key = ""
api_secret = ""

[model]
# version = "3.0"         # 1.5, 2.0, 3.0, 3.5
# temperature = 0.5       # 0.0-1.0
# max_tokens = 4096       # 1-8192
# top_k = 4               # 1-6
# domain = "generalv3"    # override the domain tag for `version`
# url = "wss://spark-api.xf-yun.com/v3.1/chat"

[session]
# history_budget = 8000          # characters kept in the rolling history
# reconnect_on_complete = true   # close after each reply, reconnect for the next
# persist_history = false
# history_file = "/path/to/history.txt"
# response_timeout_secs = 60
# connect_timeout_secs = 15
# system_prompt = "You are a helpful assistant."
# exit_keyword = "exit"

[logging]
# level = "info"          # trace, debug, info, warn, error
"##
    .to_string()
}
