use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(dead_code)]
pub const HEADER: &str =
    r#"{"user_name":"You","character_name":"Alice","create_date":"2024-03-05@14h30m00s","chat_metadata":{}}"#;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// One JSONL message line
#[allow(dead_code)]
pub fn message(text: &str, is_user: bool, send_date: &str) -> String {
    serde_json::json!({
        "name": if is_user { "You" } else { "Alice" },
        "is_user": is_user,
        "mes": text,
        "send_date": send_date,
    })
    .to_string()
}

/// Header line followed by `lines`
#[allow(dead_code)]
pub fn chat(lines: &[String]) -> String {
    let mut out = String::from(HEADER);
    for line in lines {
        out.push('\n');
        out.push_str(line);
    }
    out.push('\n');
    out
}

/// Write `<root>/<folder>/<file_name>`
#[allow(dead_code)]
pub fn write_chat(root: &Path, folder: &str, file_name: &str, content: &str) -> PathBuf {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).expect("failed to create chat folder");
    let path = dir.join(file_name);
    fs::write(&path, content).expect("failed to write chat file");
    path
}

/// A `chats/` directory with two Alice conversations and a greeting-only Bob chat
#[allow(dead_code)]
pub fn sample_chats_dir() -> TempDir {
    let tmp = TempDir::new().expect("failed to create tempdir");
    write_chat(
        tmp.path(),
        "Alice",
        "Alice - 2024-03-05@14h30m00s.jsonl",
        &chat(&[
            message("Hello there, traveler", false, "March 5, 2024 2:30pm"),
            message("Hi Alice", true, "March 5, 2024 2:31pm"),
            message("<think>be nice</think>Welcome back", false, "March 5, 2024 2:32pm"),
        ]),
    );
    write_chat(
        tmp.path(),
        "Alice",
        "Alice - 2024-03-07@09h00m00s.jsonl",
        &chat(&[
            message("Good morning", false, "March 7, 2024 9:00am"),
            message("你好", true, "March 7, 2024 9:01am"),
        ]),
    );
    write_chat(
        tmp.path(),
        "Bob",
        "Bob - 2024-04-01@10h00m00s.jsonl",
        &chat(&[message("Greetings.", false, "April 1, 2024 10:00am")]),
    );
    tmp
}
