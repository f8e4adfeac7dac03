pub async fn index() -> &'static str {
    "Quill"
}
