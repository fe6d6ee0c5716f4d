#[actix_web::main]
async fn main() {
    if let Err(err) = batch_upload::app::run().await {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
