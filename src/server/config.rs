use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub jwt_secret: String,
    pub frontend_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://daybook.db".to_string());

        let listen_addr =
            env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        // Absent means CORS stays permissive, for local development.
        let frontend_url = env::var("FRONTEND_URL").ok();

        Ok(AppConfig {
            database_url,
            listen_addr,
            jwt_secret,
            frontend_url,
        })
    }
}
