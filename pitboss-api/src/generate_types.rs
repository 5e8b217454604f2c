//! TypeScript type generation.
//!
//! Compiled only for tests; running the test writes a `.ts` file for every
//! request and response type a front end needs.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        // Output directory, in order of preference:
        // 1. PITBOSS_TS_OUTPUT_DIR
        // 2. ../ts-bindings
        let output_dir_str =
            env::var("PITBOSS_TS_OUTPUT_DIR").unwrap_or_else(|_| "../ts-bindings".to_string());
        let output_dir = Path::new(&output_dir_str);

        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir).expect("Failed to create output directory");
        }

        // Remove stale files so renamed types do not linger
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path)
                    .unwrap_or_else(|e| panic!("Failed to remove {:?}: {}", path, e));
            }
        }

        unsafe {
            env::set_var("TS_RS_EXPORT_DIR", output_dir);
        }

        use crate::api::{
            error::ErrorResponse,
            login::LoginRequest,
            pit::PitRequest,
            player::{FundsRequest, PlayerRequest},
            rundown::RundownRequest,
            status::HealthStatus,
            table::TableRequest,
            user::{RegisterRequest, RegisterResponse},
        };
        use crate::models::*;

        // Models
        Role::export().expect("Failed to export Role type");
        GameType::export().expect("Failed to export GameType type");
        UserView::export().expect("Failed to export UserView type");
        PitView::export().expect("Failed to export PitView type");
        TableView::export().expect("Failed to export TableView type");
        PlayerView::export().expect("Failed to export PlayerView type");
        RundownView::export().expect("Failed to export RundownView type");

        // Requests and responses
        ErrorResponse::export().expect("Failed to export ErrorResponse type");
        LoginRequest::export().expect("Failed to export LoginRequest type");
        RegisterRequest::export().expect("Failed to export RegisterRequest type");
        RegisterResponse::export().expect("Failed to export RegisterResponse type");
        PitRequest::export().expect("Failed to export PitRequest type");
        TableRequest::export().expect("Failed to export TableRequest type");
        PlayerRequest::export().expect("Failed to export PlayerRequest type");
        FundsRequest::export().expect("Failed to export FundsRequest type");
        RundownRequest::export().expect("Failed to export RundownRequest type");
        HealthStatus::export().expect("Failed to export HealthStatus type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
