//! Run with: cargo run --package council_stream --bin generate-types --features typescript

use std::fs;
use std::path::Path;

fn main() {
    println!("Generating TypeScript types...");

    let out_dir = Path::new("frontend/src/types/generated");

    if let Err(e) = fs::create_dir_all(out_dir) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    #[cfg(feature = "typescript")]
    {
        use ts_rs::TS;

        council_core::Phase::export_all_to(out_dir).expect("Failed to export Phase");
        council_core::ConnectionStatus::export_all_to(out_dir)
            .expect("Failed to export ConnectionStatus");
        council_core::LogEntry::export_all_to(out_dir).expect("Failed to export LogEntry");
        council_core::Verdict::export_all_to(out_dir).expect("Failed to export Verdict");
        council_core::SideEffect::export_all_to(out_dir).expect("Failed to export SideEffect");
        council_core::Decision::export_all_to(out_dir).expect("Failed to export Decision");
        council_core::AuthorizationRequest::export_all_to(out_dir)
            .expect("Failed to export AuthorizationRequest");

        council_stream::SessionSnapshot::export_all_to(out_dir)
            .expect("Failed to export SessionSnapshot");
    }

    println!("TypeScript types generated in {}", out_dir.display());
}
