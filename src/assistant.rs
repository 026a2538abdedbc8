//! Rule-based energy assistant.
//!
//! Replies are a pure function of the message, a device snapshot and the
//! tariff. Rules are tried in order and the first whose keywords appear in
//! the lowercased message answers.

use crate::analytics::by_type;
use crate::devices::Device;
use crate::tariff::Tariff;

const HOURS_PER_MONTH: f64 = 24.0 * 30.0;
/// Share of emissions an efficiency push is assumed to save.
const CO2_SAVING_SHARE: f64 = 0.2;

const SAVING_TIPS: &str = "To save energy, I recommend: \
1) Schedule HVAC to reduce temperature by 2°C during off-hours (saves ~15%), \
2) Enable smart lighting with motion sensors (saves ~20%), \
3) Put computers in sleep mode after 30 minutes of inactivity (saves ~10%).";

const HELP: &str = "I'm your energy assistant! I can help you with:\n\
\n\
• Analyzing energy consumption patterns\n\
• Identifying devices with high usage\n\
• Providing energy-saving recommendations\n\
• Detecting anomalies and issues\n\
• Calculating costs and CO2 emissions\n\
\n\
What would you like to know?";

struct Context<'a> {
    devices: &'a [Device],
    tariff: &'a Tariff,
}

impl Context<'_> {
    fn total_kw(&self) -> f64 {
        self.devices.iter().map(Device::current_kw).sum()
    }
}

struct Rule {
    keywords: &'static [&'static str],
    respond: fn(&Context<'_>) -> String,
}

const RULES: &[Rule] = &[
    Rule {
        keywords: &["consumption", "using"],
        respond: consumption,
    },
    Rule {
        keywords: &["save", "reduce"],
        respond: saving_tips,
    },
    Rule {
        keywords: &["anomal", "problem"],
        respond: anomalies,
    },
    Rule {
        keywords: &["cost", "bill"],
        respond: cost,
    },
    Rule {
        keywords: &["co2", "emission"],
        respond: emissions,
    },
];

/// Answers `message` from the current fleet state.
pub fn reply(message: &str, devices: &[Device], tariff: &Tariff) -> String {
    let lowered = message.to_lowercase();
    let ctx = Context { devices, tariff };

    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k)))
        .map_or_else(|| HELP.to_string(), |rule| (rule.respond)(&ctx))
}

fn consumption(ctx: &Context<'_>) -> String {
    let mut shares: Vec<_> = by_type(ctx.devices)
        .into_iter()
        .filter(|t| t.percentage > 0.0)
        .collect();
    shares.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

    let mut text = format!(
        "Currently, your total energy consumption is {:.2} kW.",
        ctx.total_kw()
    );
    if !shares.is_empty() {
        let top: Vec<String> = shares
            .iter()
            .take(3)
            .map(|t| format!("{} ({:.0}%)", t.device_type, t.percentage))
            .collect();
        text.push_str(&format!(" The main consumers are {}.", top.join(", ")));
    }
    text
}

fn saving_tips(_: &Context<'_>) -> String {
    SAVING_TIPS.to_string()
}

fn anomalies(ctx: &Context<'_>) -> String {
    let names: Vec<&str> = ctx
        .devices
        .iter()
        .filter(|d| d.anomaly_detected)
        .map(|d| d.name.as_str())
        .collect();

    if names.is_empty() {
        return "Great news! No anomalies detected. All devices are operating normally."
            .to_string();
    }
    format!(
        "I detected {} devices with anomalies: {}. These devices are consuming more \
         energy than usual. I recommend checking them for issues.",
        names.len(),
        names.join(", ")
    )
}

fn cost(ctx: &Context<'_>) -> String {
    let kw = ctx.total_kw();
    let monthly = kw * ctx.tariff.cost_per_kwh * HOURS_PER_MONTH;
    format!(
        "Based on current consumption of {kw:.2} kW, your estimated monthly bill is \
         ${monthly:.2}. With optimization, you could reduce this by 20-30%."
    )
}

fn emissions(ctx: &Context<'_>) -> String {
    let monthly = ctx.total_kw() * ctx.tariff.co2_kg_per_kwh * HOURS_PER_MONTH;
    format!(
        "Your current energy usage generates approximately {monthly:.2} kg of CO2 \
         emissions per month. By reducing consumption by 20%, you could save {:.2} kg of CO2.",
        monthly * CO2_SAVING_SHARE
    )
}
