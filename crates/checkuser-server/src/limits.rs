//! Process resource limits.

use std::io;

use tracing;

/// Raise the open-file-descriptor limit toward `target`.
///
/// Tries to set both soft and hard limits first; without the privilege to
/// raise the hard limit, the soft limit is raised as far as the current
/// hard limit allows. Returns the resulting soft limit.
#[cfg(unix)]
pub fn raise_nofile_limit(target: u64) -> io::Result<u64> {
    let mut current = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `current` is a valid, writable rlimit struct.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut current) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let target = target as libc::rlim_t;
    if current.rlim_cur >= target {
        return Ok(current.rlim_cur as u64);
    }

    let wanted = libc::rlimit {
        rlim_cur: target,
        rlim_max: target.max(current.rlim_max),
    };
    // SAFETY: `wanted` is a valid rlimit struct.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &wanted) } == 0 {
        tracing::info!("Raised open file limit to {}", target);
        return Ok(target as u64);
    }

    let fallback = libc::rlimit {
        rlim_cur: target.min(current.rlim_max),
        rlim_max: current.rlim_max,
    };
    // SAFETY: `fallback` is a valid rlimit struct.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &fallback) } != 0 {
        return Err(io::Error::last_os_error());
    }

    tracing::warn!(
        "Open file limit capped at {} by the hard limit (wanted {})",
        fallback.rlim_cur,
        target
    );
    Ok(fallback.rlim_cur as u64)
}

/// Resource limits are left untouched on non-unix targets.
#[cfg(not(unix))]
pub fn raise_nofile_limit(_target: u64) -> io::Result<u64> {
    Ok(0)
}
