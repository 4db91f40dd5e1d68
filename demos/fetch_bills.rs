use sfr_bill_scraper::{BillService, FetchRequest};
use tower::Service;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter("info,sfr_bill_scraper=debug")
        .init();

    // 環境変数から認証情報を取得
    let login = std::env::var("SFR_LOGIN").expect("SFR_LOGIN environment variable not set");
    let password =
        std::env::var("SFR_PASSWORD").expect("SFR_PASSWORD environment variable not set");
    let folder = std::env::var("SFR_FOLDER").unwrap_or_else(|_| "./bills".to_string());

    let mut service = BillService::new();
    let request = FetchRequest::new(login, password).with_folder_path(folder);

    println!("=== SFR Bill Fetch ===");

    match service.call(request).await {
        Ok(bills) => {
            println!("成功! {} 件", bills.len());
            for bill in &bills {
                println!(
                    "  - {} {:>8.2} € {} ({})",
                    bill.date, bill.amount, bill.file_name, bill.file_url
                );
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
        }
    }
}
