use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::config;

use super::seasons::{Season, SeasonInfo};

pub const MIN_INTERVAL_DAYS: i32 = 3;
pub const MAX_INTERVAL_DAYS: i32 = 28;

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

const SYSTEM_PROMPT: &str = "Ты эксперт по уходу за комнатными растениями. \
    Отвечай только числом - количеством дней между поливами.";

/// key: interval-estimator -> model recommendation with formula fallback
///
/// Asks a chat-completion model for a per-species watering interval. Every
/// failure path (no API key, transport error, non-numeric answer) degrades to
/// [`interval_by_formula`], so callers always get a usable interval.
#[derive(Clone)]
pub struct IntervalEstimator {
    model: String,
    client: Option<Client<OpenAIConfig>>,
}

impl IntervalEstimator {
    /// Reads `OPENAI_API_KEY` (and optionally `OPENAI_API_BASE`). Without a
    /// key the estimator stays formula-only.
    pub fn from_env() -> Self {
        match config::read_optional_env("OPENAI_API_KEY") {
            Some(key) => Self::new(
                key,
                config::SEASONAL_MODEL.clone(),
                config::read_optional_env("OPENAI_API_BASE"),
            ),
            None => Self::disabled(),
        }
    }

    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = base_url {
            openai_config = openai_config.with_api_base(base);
        }
        Self {
            model,
            client: Some(Client::with_config(openai_config)),
        }
    }

    pub fn disabled() -> Self {
        Self {
            model: config::SEASONAL_MODEL.clone(),
            client: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Recommends a watering interval in days, clamped to
    /// [`MIN_INTERVAL_DAYS`, `MAX_INTERVAL_DAYS`].
    pub async fn estimate(
        &self,
        plant_name: &str,
        base_interval: i32,
        season: &SeasonInfo,
    ) -> i32 {
        let Some(client) = &self.client else {
            return interval_by_formula(base_interval, season.season);
        };

        match self.ask_model(client, plant_name, base_interval, season).await {
            Ok(Some(days)) => {
                info!(
                    plant = plant_name,
                    days,
                    season = season.season.as_str(),
                    "model recommended watering interval"
                );
                days
            }
            Ok(None) => {
                warn!(
                    plant = plant_name,
                    "model answer had no number, falling back to formula"
                );
                interval_by_formula(base_interval, season.season)
            }
            Err(err) => {
                warn!(?err, plant = plant_name, "model call failed, falling back to formula");
                interval_by_formula(base_interval, season.season)
            }
        }
    }

    async fn ask_model(
        &self,
        client: &Client<OpenAIConfig>,
        plant_name: &str,
        base_interval: i32,
        season: &SeasonInfo,
    ) -> Result<Option<i32>> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(build_prompt(
                plant_name,
                base_interval,
                season,
            )))
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .max_completion_tokens(10u32)
            .temperature(0.3)
            .build()?;

        let response = client.chat().create(request).await?;
        let answer = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(parse_answer(&answer))
    }
}

/// Deterministic fallback: season multiplier over the summer baseline. Pure
/// and total, never touches the network.
pub fn interval_by_formula(base_days: i32, season: Season) -> i32 {
    let scaled = (f64::from(base_days) * season.multiplier()).round() as i32;
    scaled.clamp(MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS)
}

/// First integer literal in the model's free-text answer, clamped to the
/// allowed range. `None` when the answer carries no number at all.
fn parse_answer(text: &str) -> Option<i32> {
    FIRST_INTEGER
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .map(|days| days.clamp(MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS))
}

fn build_prompt(plant_name: &str, base_interval: i32, season: &SeasonInfo) -> String {
    format!(
        "Ты - эксперт по комнатным растениям.\n\n\
         Растение: {plant_name}\n\
         Базовый (летний) интервал полива: {base_interval} дней\n\
         Сейчас: {month} ({season})\n\n\
         Учитывая особенности этого вида растения и текущий сезон, какой должен быть интервал полива?\n\n\
         ВАЖНЫЕ ПРАВИЛА:\n\
         - Зимой (декабрь-февраль): большинство растений поливают в 1.5-2.5 раза РЕЖЕ\n\
         - Весной (март-май): постепенно увеличиваем полив, интервал как летом или чуть реже\n\
         - Летом (июнь-август): максимальная частота полива (самый короткий интервал)\n\
         - Осенью (сентябрь-ноябрь): постепенно сокращаем полив\n\n\
         ОСОБЕННОСТИ ВИДОВ:\n\
         - Суккуленты и кактусы зимой почти не поливают (21-28 дней)\n\
         - Тропические растения (фикусы, монстеры) зимой 10-14 дней\n\
         - Цветущие растения требуют больше воды даже зимой\n\
         - Папоротники и влаголюбивые - чаще других, но зимой тоже реже\n\n\
         Ответь ТОЛЬКО ОДНИМ ЧИСЛОМ - количество дней между поливами.\n\
         Число должно быть от {min} до {max}.",
        month = season.month_name_ru,
        season = season.season.label_ru(),
        min = MIN_INTERVAL_DAYS,
        max = MAX_INTERVAL_DAYS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_doubles_in_winter() {
        assert_eq!(interval_by_formula(7, Season::Winter), 14);
        assert_eq!(interval_by_formula(7, Season::Spring), 7);
        assert_eq!(interval_by_formula(7, Season::Summer), 6);
        assert_eq!(interval_by_formula(7, Season::Autumn), 10);
    }

    #[test]
    fn formula_stays_in_range_for_all_baselines() {
        for season in [Season::Winter, Season::Spring, Season::Summer, Season::Autumn] {
            for base in 3..=14 {
                let days = interval_by_formula(base, season);
                assert!(
                    (MIN_INTERVAL_DAYS..=MAX_INTERVAL_DAYS).contains(&days),
                    "{season:?} base {base} gave {days}"
                );
                let expected = (f64::from(base) * season.multiplier()).round() as i32;
                assert_eq!(days, expected.clamp(MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS));
            }
        }
    }

    #[test]
    fn formula_clamps_the_floor() {
        // 3 * 0.8 = 2.4 rounds to 2, below the minimum.
        assert_eq!(interval_by_formula(3, Season::Summer), MIN_INTERVAL_DAYS);
    }

    #[test]
    fn answer_parsing_takes_the_first_number() {
        assert_eq!(parse_answer("10 дней"), Some(10));
        assert_eq!(parse_answer("Полив: 7, не чаще"), Some(7));
        assert_eq!(parse_answer("примерно раз в неделю"), None);
        assert_eq!(parse_answer(""), None);
    }

    #[test]
    fn answer_parsing_clamps_out_of_range_numbers() {
        assert_eq!(parse_answer("45"), Some(MAX_INTERVAL_DAYS));
        assert_eq!(parse_answer("1"), Some(MIN_INTERVAL_DAYS));
    }

    #[test]
    fn disabled_estimator_reports_capability() {
        assert!(!IntervalEstimator::disabled().is_enabled());
    }
}
