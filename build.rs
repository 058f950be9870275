//! thinklog 构建脚本
//!
//! 记录构建时间与编译器版本，供系统快照中的运行时版本字段使用。

use chrono::Utc;
use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    println!(
        "cargo:rustc-env=THINKLOG_BUILD_TIME={}",
        Utc::now().to_rfc3339()
    );
    println!(
        "cargo:rustc-env=THINKLOG_RUSTC_VERSION={}",
        detect_rustc_version()
    );
}

/// 读取 `rustc --version` 的版本号部分，失败时返回 `unknown`
fn detect_rustc_version() -> String {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());

    Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .and_then(|text| text.split_whitespace().nth(1).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
