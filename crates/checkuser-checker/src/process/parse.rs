//! Parsers for the text printed by `ps` and `chage`.

/// Substring identifying an SSH session process (`sshd`, `sshd-session`).
const SSH_PROCESS: &str = "sshd";

/// Expiration labels printed by `chage -l`, English and Portuguese locales.
const EXPIRATION_LABELS: [&str; 2] = ["Account expires", "Conta expira"];

/// Count SSH session lines in `ps -u <user>` output, skipping the header.
pub fn count_ssh_sessions(ps_output: &str) -> u32 {
    ps_output
        .lines()
        .skip(1)
        .filter(|line| line.contains(SSH_PROCESS))
        .count() as u32
}

/// Extract the PID column from `ps -u <user>` output, skipping the header.
pub fn parse_pids(ps_output: &str) -> Vec<u32> {
    ps_output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|pid| pid.parse().ok())
        .collect()
}

/// Find the account expiration value in `chage -l <user>` output.
///
/// `"never"` is returned verbatim.
pub fn parse_expiration(chage_output: &str) -> Option<String> {
    chage_output.lines().find_map(|line| {
        let (label, value) = line.split_once(':')?;
        let label = label.trim();
        if EXPIRATION_LABELS.iter().any(|known| label == *known) {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

/// Convert a `ps` elapsed time (`[[dd-]hh:]mm:ss`) to seconds.
pub fn etime_seconds(etime: &str) -> Option<u64> {
    let (days, clock) = match etime.split_once('-') {
        Some((days, clock)) => (days.parse::<u64>().ok()?, clock),
        None => (0, etime),
    };

    let parts: Vec<u64> = clock
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<_>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return None,
    };

    days.checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

/// Pick the elapsed time of the oldest SSH session from
/// `ps -u <user> -o etime=,comm=` output.
pub fn oldest_session_elapsed(ps_output: &str) -> Option<String> {
    ps_output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let etime = fields.next()?;
            let command = fields.next()?;
            if !command.contains(SSH_PROCESS) {
                return None;
            }
            Some((etime_seconds(etime)?, etime))
        })
        .max_by_key(|(seconds, _)| *seconds)
        .map(|(_, etime)| etime.to_string())
}
