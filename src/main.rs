#[actix_web::main]
async fn main() -> Result<(), biblio_analytics_lib::domain::error::AppError> {
    biblio_analytics_lib::run().await
}
