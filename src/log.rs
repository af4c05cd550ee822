//! 日志辅助函数，开启 `browser_log` 时输出到浏览器控制台。

use crate::game::SessionPhase;

const TARGET: &str = "concentron";

#[inline]
pub fn info(msg: &str) {
    ::log::info!(target: TARGET, "{msg}");
}

#[inline]
pub fn warn(msg: &str) {
    ::log::warn!(target: TARGET, "{msg}");
}

#[inline]
pub fn debug(label: &str, msg: &str) {
    ::log::debug!(target: TARGET, "[{label}] {msg}");
}

/// 记录一次玩家操作。
#[inline]
pub fn action(name: &str, details: &str) {
    ::log::info!(target: TARGET, ">> {name}: {details}");
}

/// 单行的对局摘要。
pub fn session_summary(
    phase: SessionPhase,
    moves: u32,
    elapsed_time: u32,
    matched_pairs: u32,
    pair_count: u32,
) {
    ::log::debug!(
        target: TARGET,
        "session phase={phase:?} moves={moves} time={elapsed_time}s pairs={matched_pairs}/{pair_count}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_do_not_panic_without_a_logger() {
        info("info");
        warn("warn");
        debug("label", "debug");
        action("reveal_card", "index=3");
        session_summary(SessionPhase::Idle, 0, 0, 0, 8);
    }
}
