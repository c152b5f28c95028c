// Binary to export TypeScript types
// Run with: cargo run --bin export_types

use ts_rs::TS;

fn main() {
    println!("Exporting TypeScript types...");

    linecount_server::JobSnapshot::export().expect("Failed to export JobSnapshot");
    linecount_server::routes::UploadResponse::export().expect("Failed to export UploadResponse");
    linecount_server::ErrorResponse::export().expect("Failed to export ErrorResponse");

    println!("✓ TypeScript types exported successfully to web/src/bindings/");
}
