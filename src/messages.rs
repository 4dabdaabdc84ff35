//! messages.rs — Texto das notificações em texto puro

use crate::schedule::ScheduleModel;
use crate::schedule::SchedulePayload;
use crate::types::{NextEvent, OutagePeriod, VoltageStats};
use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Weekday};
use std::fmt::Write as _;

/// `<60s` em segundos; depois minutos arredondados e horas.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{}s", seconds.max(0.0) as i64);
    }
    let minutes = (seconds / 60.0).round() as i64;
    if minutes < 60 {
        return format!("{minutes}min");
    }
    let (hours, mins) = (minutes / 60, minutes % 60);
    if mins > 0 {
        format!("{hours}h {mins}min")
    } else {
        format!("{hours}h")
    }
}

pub fn format_period_length(duration: TimeDelta) -> String {
    let minutes = duration.num_minutes();
    if minutes >= 60 {
        let (hours, mins) = (minutes / 60, minutes % 60);
        if mins > 0 {
            return format!("{hours}h {mins}min");
        }
        return format!("{hours}h");
    }
    format!("{minutes}min")
}

fn hhmm<Tz: TimeZone>(instant: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.format("%H:%M").to_string()
}

fn day_marker(is_tomorrow: bool) -> &'static str {
    if is_tomorrow { " (amanhã)" } else { "" }
}

fn next_event_line(next: &NextEvent) -> String {
    match next {
        NextEvent::Outage {
            period,
            is_tomorrow,
        } => format!(
            "Próximo desligamento programado: {} - {}{}",
            hhmm(&period.start),
            hhmm(&period.end),
            day_marker(*is_tomorrow)
        ),
        NextEvent::PowerOn { at, is_tomorrow } => format!(
            "Volta prevista pelo cronograma às {}{}",
            hhmm(at),
            day_marker(*is_tomorrow)
        ),
    }
}

/// Mensagem de status. `event_time` já no fuso de exibição. Tensão e
/// estatísticas só aparecem com energia presente.
pub fn format_status<Tz: TimeZone>(
    lit: bool,
    duration_seconds: f64,
    event_time: &DateTime<Tz>,
    next: Option<&NextEvent>,
    voltage: Option<f64>,
    stats: Option<&VoltageStats>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let (header, period) = if lit {
        ("Energia voltou", "Ficou sem energia por")
    } else {
        ("Energia caiu", "Ficou com energia por")
    };
    let mut lines = vec![
        format!("{} {}", hhmm(event_time), header),
        format!("{} {}", period, format_duration(duration_seconds)),
    ];
    if let Some(next) = next {
        lines.push(next_event_line(next));
    }
    if lit {
        match voltage {
            Some(v) if v > 0.0 => lines.push(format!("Tensão na rede: {v:.1} V")),
            _ => lines.push("Tensão na rede: sem dados".to_string()),
        }
        if let Some(stats) = stats {
            lines.push(format!(
                "Últimas 24h: mín {:.1} V, máx {:.1} V, média {:.1} V",
                stats.min, stats.max, stats.avg
            ));
        }
    }
    lines.join("\n")
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "segunda-feira",
        Weekday::Tue => "terça-feira",
        Weekday::Wed => "quarta-feira",
        Weekday::Thu => "quinta-feira",
        Weekday::Fri => "sexta-feira",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

fn push_periods(out: &mut String, periods: &[OutagePeriod]) {
    for p in periods {
        let _ = write!(
            out,
            "\n- {} - {} ({})",
            hhmm(&p.start),
            hhmm(&p.end),
            format_period_length(p.duration())
        );
    }
}

/// Legenda do cronograma: hoje sempre, amanhã só se houver desligamentos.
pub fn format_schedule_caption(
    model: &ScheduleModel,
    payload: &SchedulePayload,
    now: DateTime<chrono_tz::Tz>,
) -> String {
    let today = now.date_naive();
    let group = model.group().trim_start_matches("GPV");

    let mut out = format!(
        "Cronograma de desligamentos para hoje, {} ({}), grupo {}:",
        today.format("%d.%m.%Y"),
        weekday_name(today.weekday()),
        group
    );
    let outages = model.outages_for_date(payload, today);
    if outages.is_empty() {
        out.push_str("\n- Nenhum desligamento programado");
    } else {
        push_periods(&mut out, &outages);
    }

    if let Some(tomorrow) = today.succ_opt() {
        let outages = model.outages_for_date(payload, tomorrow);
        if !outages.is_empty() {
            let _ = write!(
                out,
                "\n\nCronograma para amanhã, {} ({}), grupo {}:",
                tomorrow.format("%d.%m.%Y"),
                weekday_name(tomorrow.weekday()),
                group
            );
            push_periods(&mut out, &outages);
        }
    }
    out
}
