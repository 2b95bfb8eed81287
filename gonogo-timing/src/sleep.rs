use std::time::Duration;

/// Sleeps for `duration` with better-than-scheduler precision. On Linux this
/// goes through `clock_nanosleep` against the monotonic clock; elsewhere a
/// coarse sleep is finished with a short spin.
pub fn precise_sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    #[cfg(target_os = "linux")]
    linux_sleep(duration);
    #[cfg(not(target_os = "linux"))]
    hybrid_sleep(duration);
}

#[cfg(target_os = "linux")]
fn linux_sleep(duration: Duration) {
    use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

    let req = timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };

    unsafe {
        clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
    }
}

#[cfg(not(target_os = "linux"))]
fn hybrid_sleep(duration: Duration) {
    use std::time::Instant;

    let deadline = Instant::now() + duration;
    const SPIN_TAIL: Duration = Duration::from_micros(500);
    if duration > SPIN_TAIL {
        std::thread::sleep(duration - SPIN_TAIL);
    }
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}
