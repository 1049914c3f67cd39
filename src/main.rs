#[tokio::main]
async fn main() {
    if let Err(e) = symptom_triage_lib::run().await {
        eprintln!("symptom-triage: {e}");
        std::process::exit(1);
    }
}
