/// Sentence polarity loading - tokenize a review CSV and inspect the first batch
///
/// Usage: cargo run --example text_polarity -- <reviews.csv> <tokenizer.json>
use candle_core::Device;
use tensor_datasets::data::{DataLoader, Dataset, PretrainedTokenizer, TextDataset};
use tensor_datasets::TokenizerConfig;

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let data_path = args
        .next()
        .unwrap_or_else(|| "rt-polarity/rt-polarity-processed.csv".to_string());
    let tokenizer_source = args.next().unwrap_or_else(|| "bert-base-cased".to_string());

    let device = Device::Cpu;

    let tokenizer_config = TokenizerConfig {
        source: tokenizer_source,
        ..Default::default()
    };
    let tokenizer = PretrainedTokenizer::from_config(&tokenizer_config)?;
    log::info!(
        "Tokenizer ready: vocab_size={}, max_length={}",
        tokenizer.vocab_size(),
        tokenizer.max_length()
    );

    let dataset = TextDataset::new(
        data_path.as_str(),
        ["review"],
        ["label"],
        &tokenizer,
        &device,
    )?;
    log::info!("Dataset loaded: {} reviews", dataset.len());

    let mut loader = DataLoader::new(dataset, 1, false)?;

    if let Some(batch) = loader.next_batch(&device)? {
        for (col, encoding) in loader.dataset().feature_cols().iter().zip(&batch.features) {
            println!("{}_bert_tkn input_ids: {}", col, encoding.input_ids);
            println!("{}_bert_tkn attention_mask: {}", col, encoding.attention_mask);
        }
        println!("target: {}", batch.target);
    }

    Ok(())
}
