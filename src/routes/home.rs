/// GET / — static greeting, handy as a liveness probe.
pub async fn home() -> &'static str {
    "Welcome to the job sheet bot!"
}
