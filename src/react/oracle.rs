//! 完成判定：固定短语词典
//!
//! 模型回复未携带动作时，对整段文本做大小写不敏感的短语匹配；
//! 命中任意短语即判定任务完成。外部检查点确认走 InteractionProvider。

/// 完成短语词典
pub const COMPLETION_PHRASES: &[&str] = &[
    "task complete",
    "query resolved",
    "done",
    "finished",
    "final answer",
    "summary:",
    "in conclusion",
    "successfully completed",
];

/// 文本是否命中完成词典（大小写不敏感）
pub fn is_completion(text: &str) -> bool {
    let lowered = text.to_lowercase();
    COMPLETION_PHRASES.iter().any(|p| lowered.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases_match_case_insensitively() {
        assert!(is_completion("Task complete."));
        assert!(is_completion("The query has been resolved. DONE."));
        assert!(is_completion("Summary: everything went fine"));
        assert!(is_completion("IN CONCLUSION, all set"));
    }

    #[test]
    fn test_plain_reasoning_does_not_match() {
        assert!(!is_completion("I still need to inspect the repository."));
        assert!(!is_completion(""));
    }
}
