//! Fixed texts and reply formatting

use chrono::{DateTime, TimeZone};
use rand::seq::SliceRandom;

use super::calc::{self, CalcError};
use crate::error::ProviderError;
use crate::event::InboundRadioEvent;
use crate::provider::{Direction, WeatherReport};

pub const HELP: &str = "📋 Доступные команды:\n\
/test - тест связи\n\
/time - дата и время\n\
/happy - случайный анекдот\n\
/calc 2+2 - калькулятор\n\
/translate текст - перевод\n\
/weather город - погода\n\
/ai вопрос - нейросеть\n\
/help - помощь";

pub const CALC_USAGE: &str = "🧮 Пример: /calc 2+2*3";
pub const CALC_REJECTED: &str = "❌ Только цифры и + - * / ( )";
pub const CALC_DIVISION_BY_ZERO: &str = "❌ Деление на ноль";
pub const CALC_MALFORMED: &str = "❌ Ошибка в выражении";

pub const TRANSLATE_USAGE: &str = "🌍 Пример: /translate Hello world";
pub const TRANSLATE_FAILED: &str = "❌ Ошибка перевода";

pub const WEATHER_FAILED: &str = "❌ Не удалось получить погоду";

pub const AI_USAGE: &str = "Напиши вопрос после /ai";
pub const AI_THINKING: &str = "Думаю...";
pub const AI_FAILED: &str = "❌ Ошибка нейросети";

pub const JOKES: &[&str] = &[
    "Вовочка, почему ты опоздал в школу? - Учительница, я видел сон, что путешествую по Африке, а потом заснул и опоздал!",
    "— Доктор, я постоянно теряю память! — С какого времени? — С какого времени?",
    "Встречаются два хакера: — Ты слышал, Google купил Intel? — Да ладно! — Ага, теперь у них будет Googlе Inside.",
    "— Почему программисты любят зиму? — Потому что в холода кэш не сбрасывается.",
    "Штирлиц сидел в кресле и ел суп. Кресло было мягкое, а суп жидкий.",
    "— Алло, это служба поддержки? У меня компьютер не включается! — А вы вилку в розетку воткнули? — А её вынимать надо было?",
    "Колобок повесился. Следствие показало - у него была утечка памяти.",
    "— Дорогой, ты меня любишь? — Конечно! — А докажи! — А ты компилятор?",
    "Вовочка на уроке: — Марья Ивановна, а вы верите в любовь с первого взгляда? — Верю, Вовочка. Особенно когда вижу твой дневник!",
    "— Ты где так накололся? — В одноклассниках. — Там же дети! — А у меня дрель!",
];

/// Round half away from zero, unlike `{:.N}` which rounds ties to even
fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn signal_test(sender_name: &str, event: &InboundRadioEvent) -> String {
    format!(
        "Тест {sender_name}: прыжков {hops} SNR {snr:.1} RSSI {rssi}",
        hops = event.hop_count(),
        snr = round_to(event.snr as f64, 1),
        rssi = event.rssi,
    )
}

pub fn joke() -> String {
    let joke = JOKES.choose(&mut rand::thread_rng()).copied().unwrap_or_default();
    format!("😄 {joke}")
}

pub fn time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "🕐 {time}\n📅 {date}",
        time = now.format("%H:%M:%S"),
        date = now.format("%d.%m.%Y")
    )
}

/// Full `/calc` reply for the argument text
pub fn calculate(args: &str) -> String {
    let expression = args.trim().replace(',', ".");
    if expression.is_empty() {
        return CALC_USAGE.to_string();
    }

    match calc::evaluate(&expression) {
        Ok(result) => format!("🧮 {expression} = {result}", result = result.rounded()),
        Err(CalcError::InvalidCharacter(_)) => CALC_REJECTED.to_string(),
        Err(CalcError::DivisionByZero) => CALC_DIVISION_BY_ZERO.to_string(),
        Err(CalcError::Syntax) => CALC_MALFORMED.to_string(),
    }
}

pub fn translation(direction: Direction, translated: &str) -> String {
    format!("{flags}: {translated}", flags = direction.flags())
}

pub fn weather_searching(city: &str) -> String {
    format!("☀️ Ищу погоду в {city}...")
}

fn weather_emoji(condition: &str) -> &'static str {
    let condition = condition.to_lowercase();
    if condition.contains("дождь") {
        "🌧"
    } else if condition.contains("снег") {
        "❄️"
    } else if condition.contains("облач") || condition.contains("пасмур") {
        "☁️"
    } else {
        "☀️"
    }
}

pub fn weather(report: &WeatherReport) -> String {
    let wind_ms = (report.wind_kph / 3.6).round() as i64;
    format!(
        "{emoji} Погода в {location}, {country}:\n\
         🌡 {temp}°C (ош.{feels}°C)\n\
         ☁️ {condition}\n\
         💧 {humidity}% 💨 {wind_ms}м/с",
        emoji = weather_emoji(&report.condition),
        location = report.location,
        country = report.country,
        temp = report.temp_c.round() as i64,
        feels = report.feels_like_c.round() as i64,
        condition = report.condition,
        humidity = report.humidity,
    )
}

pub fn weather_error(city: &str, err: &ProviderError) -> String {
    match err {
        ProviderError::NotConfigured { key } => not_configured(key),
        ProviderError::NotFound(_) => format!("❌ Город '{city}' не найден"),
        _ => WEATHER_FAILED.to_string(),
    }
}

pub fn not_configured(key: &str) -> String {
    format!("❌ Укажите {key} в настройках")
}

/// Strip markdown emphasis and flatten line breaks in assistant output
pub fn sanitize_answer(answer: &str) -> String {
    answer
        .replace(['*', '#', '`'], "")
        .replace('\n', " ")
        .replace("  ", " ")
        .trim()
        .to_string()
}

pub fn chat_relay(sender_name: &str, text: &str) -> String {
    format!(
        "📡 <b>{name}</b>: {text}",
        name = crate::chat::escape_html(sender_name),
        text = crate::chat::escape_html(text)
    )
}
