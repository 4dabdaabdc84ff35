//! schedule.rs — Cronograma de desligamentos publicado
//!
//! Converte a tabela horária de códigos em intervalos contínuos de falta de
//! energia e responde "quando é o próximo desligamento" e "quando a energia
//! volta" relativos a um instante qualquer.
//!
//! Formato do payload:
//!
//! ```text
//! { "regionId": "...", "lastUpdated": "...",
//!   "fact": { "data": { "<unix-secs da meia-noite>": { "<grupo>": { "1": "yes", ..., "24": "no" } } } } }
//! ```
//!
//! O rótulo da hora é 1..=24 e representa a hora que *termina* nele
//! (rótulo 8 = 07:00–08:00).

use crate::types::{NextEvent, OutagePeriod};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Código de uma hora na tabela do cronograma.
///
/// `Maybe`, `MaybeFirst` e `MaybeSecond` são reconhecidos mas nunca contam
/// como desligamento confirmado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCode {
    Yes,
    No,
    First,
    Second,
    Maybe,
    MaybeFirst,
    MaybeSecond,
}

impl DayCode {
    /// Códigos desconhecidos são tratados como energia presente.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "no" => DayCode::No,
            "first" => DayCode::First,
            "second" => DayCode::Second,
            "maybe" => DayCode::Maybe,
            "mfirst" => DayCode::MaybeFirst,
            "msecond" => DayCode::MaybeSecond,
            _ => DayCode::Yes,
        }
    }

    /// Sub-intervalo confirmado dentro da hora, em minutos desde o início dela.
    fn slot_minutes(self) -> Option<(i64, i64)> {
        match self {
            DayCode::No => Some((0, 60)),
            DayCode::First => Some((0, 30)),
            DayCode::Second => Some((30, 60)),
            _ => None,
        }
    }
}

/// Tabela de um dia: rótulo da hora (1..=24) → código.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayTable(BTreeMap<u8, DayCode>);

impl DayTable {
    /// Lê o objeto `{"1": "yes", ...}` de um grupo. Chaves fora de 1..=24 e
    /// valores não textuais são ignorados.
    pub fn from_json(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        map.iter()
            .filter_map(|(hour, code)| {
                let hour = hour.parse::<u8>().ok().filter(|h| (1..=24).contains(h))?;
                Some((hour, DayCode::parse(code.as_str()?)))
            })
            .collect()
    }

    /// Horas ausentes valem `Yes`.
    pub fn code(&self, hour: u8) -> DayCode {
        self.0.get(&hour).copied().unwrap_or(DayCode::Yes)
    }
}

impl FromIterator<(u8, DayCode)> for DayTable {
    fn from_iter<I: IntoIterator<Item = (u8, DayCode)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolve um horário de parede local. Na volta do relógio vale a primeira
/// ocorrência; num horário pulado vale o primeiro instante válido seguinte.
fn resolve_local(naive: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    let mut candidate = naive;
    for _ in 0..12 {
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant;
        }
        candidate += TimeDelta::minutes(15);
    }
    tz.from_utc_datetime(&naive)
}

/// Junta períodos ordenados cujo fim coincide com o início do seguinte.
pub fn coalesce(periods: &[OutagePeriod]) -> Vec<OutagePeriod> {
    let mut merged: Vec<OutagePeriod> = Vec::with_capacity(periods.len());
    for period in periods {
        match merged.last_mut() {
            Some(current) if current.end == period.start => current.end = period.end,
            _ => merged.push(*period),
        }
    }
    merged
}

/// Comprime a tabela de um dia em intervalos de desligamento confirmados,
/// em ordem cronológica e sem sobreposição. Os rótulos são horas de parede:
/// o rótulo 8 é 07:00–08:00 mesmo em dia de troca de horário. Uma hora
/// inexistente não gera intervalo, e uma hora não confirmada sempre deixa um
/// buraco, então basta juntar sub-intervalos que se tocam.
pub fn merge_intervals(table: &DayTable, day: NaiveDate, tz: Tz) -> Vec<OutagePeriod> {
    let midnight = day.and_time(NaiveTime::MIN);
    let slots: Vec<OutagePeriod> = (1..=24u8)
        .filter_map(|hour| {
            let (from, to) = table.code(hour).slot_minutes()?;
            let hour_start = midnight + TimeDelta::hours(i64::from(hour) - 1);
            let period = OutagePeriod {
                start: resolve_local(hour_start + TimeDelta::minutes(from), tz),
                end: resolve_local(hour_start + TimeDelta::minutes(to), tz),
            };
            (period.start < period.end).then_some(period)
        })
        .collect();
    coalesce(&slots)
}

/// Próximo desligamento estritamente futuro. Um intervalo já em andamento
/// não conta. Sem nada hoje, devolve o primeiro de amanhã.
pub fn next_outage(
    today: &DayTable,
    tomorrow: &DayTable,
    from: DateTime<Tz>,
) -> (Option<OutagePeriod>, bool) {
    let tz = from.timezone();
    let day = from.date_naive();

    let upcoming = merge_intervals(today, day, tz)
        .into_iter()
        .find(|o| o.end > from && o.start > from);
    if upcoming.is_some() {
        return (upcoming, false);
    }

    match next_day(day).and_then(|d| merge_intervals(tomorrow, d, tz).into_iter().next()) {
        Some(first) => (Some(first), true),
        None => (None, false),
    }
}

/// Instante em que a energia volta: fim do intervalo em andamento ou do
/// próximo. Sem nada hoje, usa o primeiro intervalo de amanhã.
pub fn next_power_on(
    today: &DayTable,
    tomorrow: &DayTable,
    from: DateTime<Tz>,
) -> (Option<DateTime<Tz>>, bool) {
    let tz = from.timezone();
    let day = from.date_naive();

    if let Some(o) = merge_intervals(today, day, tz)
        .into_iter()
        .find(|o| o.end > from)
    {
        return (Some(o.end), false);
    }

    match next_day(day).and_then(|d| merge_intervals(tomorrow, d, tz).into_iter().next()) {
        Some(first) => (Some(first.end), true),
        None => (None, false),
    }
}

fn next_day(day: NaiveDate) -> Option<NaiveDate> {
    day.succ_opt()
}

/// Payload bruto da fonte do cronograma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchedulePayload(pub Value);

impl SchedulePayload {
    fn fact_data(&self) -> Option<&Map<String, Value>> {
        self.0.get("fact")?.get("data")?.as_object()
    }

    pub fn has_fact(&self) -> bool {
        self.0.get("fact").is_some()
    }

    pub fn region_id(&self) -> Option<&Value> {
        self.0.get("regionId")
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.0.get("lastUpdated")?.as_str()
    }

    /// Entradas de `fact.data` com a data local já resolvida; chaves que não
    /// são timestamps são ignoradas.
    fn dated_entries(&self, tz: Tz) -> impl Iterator<Item = (&String, NaiveDate, &Value)> {
        self.fact_data().into_iter().flatten().filter_map(move |(key, groups)| {
            let secs = key.parse::<i64>().ok()?;
            let instant = Utc.timestamp_opt(secs, 0).single()?;
            Some((key, instant.with_timezone(&tz).date_naive(), groups))
        })
    }
}

/// Linha do histórico de cronogramas aceitos.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRecord {
    pub data: SchedulePayload,
    pub last_updated: String,
    /// Legenda enviada junto; `None` quando não houve notificação.
    pub update_message: Option<String>,
}

/// Modelo do cronograma de um grupo. Guarda apenas o último payload aceito.
#[derive(Debug, Clone)]
pub struct ScheduleModel {
    group: String,
    tz: Tz,
    cached: Option<SchedulePayload>,
}

impl ScheduleModel {
    pub fn new(group: impl Into<String>, tz: Tz) -> Self {
        Self {
            group: group.into(),
            tz,
            cached: None,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn cached(&self) -> Option<&SchedulePayload> {
        self.cached.as_ref()
    }

    pub fn set_cached(&mut self, payload: SchedulePayload) {
        self.cached = Some(payload);
    }

    /// Tabela do grupo monitorado para a data (primeira entrada que casar).
    pub fn day_table(&self, payload: &SchedulePayload, date: NaiveDate) -> Option<DayTable> {
        payload
            .dated_entries(self.tz)
            .find_map(|(_, d, groups)| {
                if d == date {
                    groups.get(&self.group)
                } else {
                    None
                }
            })
            .map(DayTable::from_json)
    }

    pub fn outages_for_date(&self, payload: &SchedulePayload, date: NaiveDate) -> Vec<OutagePeriod> {
        self.day_table(payload, date)
            .map(|table| merge_intervals(&table, date, self.tz))
            .unwrap_or_default()
    }

    fn tables_around(&self, payload: &SchedulePayload, from: DateTime<Tz>) -> (DayTable, DayTable) {
        let today = from.date_naive();
        let tomorrow = next_day(today)
            .and_then(|d| self.day_table(payload, d))
            .unwrap_or_default();
        (self.day_table(payload, today).unwrap_or_default(), tomorrow)
    }

    pub fn next_outage(&self, from: DateTime<Utc>) -> (Option<OutagePeriod>, bool) {
        let Some(payload) = &self.cached else {
            return (None, false);
        };
        let from = from.with_timezone(&self.tz);
        let (today, tomorrow) = self.tables_around(payload, from);
        next_outage(&today, &tomorrow, from)
    }

    pub fn next_power_on(&self, from: DateTime<Utc>) -> (Option<DateTime<Tz>>, bool) {
        let Some(payload) = &self.cached else {
            return (None, false);
        };
        let from = from.with_timezone(&self.tz);
        let (today, tomorrow) = self.tables_around(payload, from);
        next_power_on(&today, &tomorrow, from)
    }

    /// Com energia, interessa o próximo desligamento; sem energia, a volta.
    pub fn next_event(&self, lit: bool, from: DateTime<Utc>) -> Option<NextEvent> {
        if lit {
            let (period, is_tomorrow) = self.next_outage(from);
            period.map(|period| NextEvent::Outage {
                period,
                is_tomorrow,
            })
        } else {
            let (at, is_tomorrow) = self.next_power_on(from);
            at.map(|at| NextEvent::PowerOn { at, is_tomorrow })
        }
    }

    /// Hash do conteúdo relevante (grupo monitorado, hoje e amanhã). Os mapas
    /// do `serde_json` são ordenados por chave, então a serialização já é
    /// canônica. Vazio se não houver seção `fact`.
    pub fn fingerprint(&self, payload: &SchedulePayload, today: NaiveDate, tomorrow: NaiveDate) -> String {
        if !payload.has_fact() {
            return String::new();
        }
        let relevant: BTreeMap<&str, Value> = payload
            .dated_entries(self.tz)
            .filter(|(_, d, _)| *d == today || *d == tomorrow)
            .filter_map(|(key, _, groups)| Some((key.as_str(), groups.get(&self.group)?.clone())))
            .collect();
        let serialized = serde_json::to_string(&relevant).unwrap_or_default();
        hex::encode(Sha256::digest(serialized.as_bytes()))
    }

    /// Verdadeiro se há ao menos uma entrada (de qualquer grupo) para hoje e
    /// para amanhã.
    pub fn is_complete(&self, payload: &SchedulePayload, today: NaiveDate, tomorrow: NaiveDate) -> bool {
        let mut has_today = false;
        let mut has_tomorrow = false;
        for (_, date, _) in payload.dated_entries(self.tz) {
            has_today |= date == today;
            has_tomorrow |= date == tomorrow;
        }
        has_today && has_tomorrow
    }

    /// Mantém apenas o grupo monitorado, para persistir o cache.
    pub fn filter_for_group(&self, payload: &SchedulePayload) -> SchedulePayload {
        if !payload.has_fact() {
            return payload.clone();
        }
        let data: Map<String, Value> = payload
            .fact_data()
            .into_iter()
            .flatten()
            .filter_map(|(key, groups)| {
                let table = groups.get(&self.group)?;
                let mut only = Map::new();
                only.insert(self.group.clone(), table.clone());
                Some((key.clone(), Value::Object(only)))
            })
            .collect();
        SchedulePayload(serde_json::json!({
            "regionId": payload.region_id().cloned().unwrap_or(Value::Null),
            "lastUpdated": payload.last_updated(),
            "fact": { "data": data },
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono_tz::Europe::Kyiv;
    use serde_json::json;
    use test_case::test_case;

    pub(crate) const GROUP: &str = "GPV6.2";

    pub(crate) fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 12).unwrap()
    }

    pub(crate) fn at(date: NaiveDate, h: u32, m: u32) -> DateTime<Tz> {
        Kyiv.from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
            .single()
            .unwrap()
    }

    fn table(entries: &[(u8, &str)]) -> DayTable {
        entries.iter().map(|(h, c)| (*h, DayCode::parse(c))).collect()
    }

    fn period(date: NaiveDate, from: (u32, u32), to: (u32, u32)) -> OutagePeriod {
        OutagePeriod {
            start: at(date, from.0, from.1),
            end: at(date, to.0, to.1),
        }
    }

    pub(crate) fn midnight_key(date: NaiveDate) -> String {
        resolve_local(date.and_time(NaiveTime::MIN), Kyiv)
            .timestamp()
            .to_string()
    }

    pub(crate) fn payload(days: &[(NaiveDate, Value)]) -> SchedulePayload {
        let mut data = Map::new();
        for (date, groups) in days {
            data.insert(midnight_key(*date), groups.clone());
        }
        SchedulePayload(json!({
            "regionId": "kyiv-region",
            "lastUpdated": "2026-02-12T10:00:00+02:00",
            "fact": { "data": data },
        }))
    }

    fn model() -> ScheduleModel {
        ScheduleModel::new(GROUP, Kyiv)
    }

    #[test_case("yes", false; "yes")]
    #[test_case("no", true; "no")]
    #[test_case("first", true; "first")]
    #[test_case("second", true; "second")]
    #[test_case("maybe", false; "maybe")]
    #[test_case("mfirst", false; "mfirst")]
    #[test_case("msecond", false; "msecond")]
    #[test_case("garbage", false; "unknown")]
    fn confirmed_codes(raw: &str, confirmed: bool) {
        assert_eq!(DayCode::parse(raw).slot_minutes().is_some(), confirmed);
    }

    #[test]
    fn contiguous_full_and_half_hours_merge() {
        let t = table(&[(8, "no"), (9, "no"), (10, "first")]);
        assert_eq!(
            merge_intervals(&t, day(), Kyiv),
            vec![period(day(), (7, 0), (9, 30))]
        );
    }

    #[test]
    fn second_half_after_full_hour_leaves_gap() {
        let t = table(&[(8, "no"), (9, "no"), (10, "second")]);
        assert_eq!(
            merge_intervals(&t, day(), Kyiv),
            vec![
                period(day(), (7, 0), (9, 0)),
                period(day(), (9, 30), (10, 0)),
            ]
        );
    }

    #[test]
    fn half_hours_merge_only_across_the_boundary() {
        let t = table(&[(5, "first"), (6, "second")]);
        // first da hora 5 = 04:00–04:30, second da hora 6 = 05:30–06:00
        assert_eq!(
            merge_intervals(&t, day(), Kyiv),
            vec![period(day(), (4, 0), (4, 30)), period(day(), (5, 30), (6, 0))]
        );

        let t = table(&[(5, "second"), (6, "first")]);
        assert_eq!(
            merge_intervals(&t, day(), Kyiv),
            vec![period(day(), (4, 30), (5, 30))]
        );
    }

    #[test]
    fn speculative_codes_break_runs() {
        let t = table(&[(1, "no"), (2, "maybe"), (3, "no"), (4, "mfirst"), (5, "msecond")]);
        assert_eq!(
            merge_intervals(&t, day(), Kyiv),
            vec![period(day(), (0, 0), (1, 0)), period(day(), (2, 0), (3, 0))]
        );
    }

    #[test]
    fn last_hour_runs_to_midnight() {
        let t = table(&[(23, "no"), (24, "no")]);
        let merged = merge_intervals(&t, day(), Kyiv);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, at(day(), 22, 0));
        assert_eq!(merged[0].end, at(day().succ_opt().unwrap(), 0, 0));
    }

    #[test]
    fn spring_forward_keeps_wall_clock_labels() {
        // 2026-03-29 em Kyiv: 03:00 EET pula para 04:00 EEST
        let d = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();
        assert_eq!(
            merge_intervals(&table(&[(8, "no")]), d, Kyiv),
            vec![period(d, (7, 0), (8, 0))]
        );

        // A hora pulada some, e as vizinhas se encostam
        let merged = merge_intervals(&table(&[(3, "no"), (4, "no"), (5, "no")]), d, Kyiv);
        assert_eq!(merged, vec![period(d, (2, 0), (5, 0))]);
        assert_eq!(merged[0].duration(), TimeDelta::hours(2));

        assert!(merge_intervals(&table(&[(4, "first")]), d, Kyiv).is_empty());
    }

    #[test]
    fn fall_back_keeps_wall_clock_labels() {
        // 2026-10-25 em Kyiv: 04:00 EEST volta para 03:00 EET
        let d = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        assert_eq!(
            merge_intervals(&table(&[(8, "no")]), d, Kyiv),
            vec![period(d, (7, 0), (8, 0))]
        );

        // A hora repetida começa na primeira ocorrência
        let repeated = merge_intervals(&table(&[(4, "no")]), d, Kyiv);
        let utc = |h| Utc.with_ymd_and_hms(2026, 10, 25, h, 0, 0).unwrap();
        assert_eq!(repeated.len(), 1);
        assert_eq!(repeated[0].start, utc(0).with_timezone(&Kyiv));
        assert_eq!(repeated[0].end, utc(2).with_timezone(&Kyiv));
    }

    #[test]
    fn merge_is_idempotent_and_ordered() {
        let t = table(&[
            (1, "second"),
            (2, "no"),
            (4, "first"),
            (7, "no"),
            (8, "first"),
            (12, "second"),
            (13, "no"),
        ]);
        let merged = merge_intervals(&t, day(), Kyiv);
        assert_eq!(coalesce(&merged), merged);
        for pair in merged.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
        for p in &merged {
            assert!(p.start < p.end);
        }
    }

    #[test]
    fn empty_table_has_no_outages() {
        assert!(merge_intervals(&DayTable::default(), day(), Kyiv).is_empty());
    }

    #[test]
    fn ongoing_outage_power_on_and_next_outage() {
        // [14:00, 17:00) e [19:00, 20:00)
        let today = table(&[(15, "no"), (16, "no"), (17, "no"), (20, "no")]);
        let from = at(day(), 14, 37);

        let (on, is_tomorrow) = next_power_on(&today, &DayTable::default(), from);
        assert_eq!(on, Some(at(day(), 17, 0)));
        assert!(!is_tomorrow);

        let (next, is_tomorrow) = next_outage(&today, &DayTable::default(), from);
        assert_eq!(next, Some(period(day(), (19, 0), (20, 0))));
        assert!(!is_tomorrow);
    }

    #[test]
    fn falls_back_to_tomorrow() {
        let today = table(&[(3, "no")]);
        let tomorrow = table(&[(9, "first"), (11, "no")]);
        let from = at(day(), 14, 0);
        let next_day = day().succ_opt().unwrap();

        let (next, is_tomorrow) = next_outage(&today, &tomorrow, from);
        assert_eq!(next, Some(period(next_day, (8, 0), (8, 30))));
        assert!(is_tomorrow);

        let (on, is_tomorrow) = next_power_on(&today, &tomorrow, from);
        assert_eq!(on, Some(at(next_day, 8, 30)));
        assert!(is_tomorrow);
    }

    #[test]
    fn ongoing_only_outage_reports_tomorrow_as_next() {
        let today = table(&[(15, "no")]);
        let tomorrow = table(&[(2, "no")]);
        let (next, is_tomorrow) = next_outage(&today, &tomorrow, at(day(), 14, 10));
        assert_eq!(next.map(|p| p.start), Some(at(day().succ_opt().unwrap(), 1, 0)));
        assert!(is_tomorrow);
    }

    #[test]
    fn nothing_scheduled() {
        let from = at(day(), 12, 0);
        assert_eq!(
            next_outage(&DayTable::default(), &DayTable::default(), from),
            (None, false)
        );
        assert_eq!(
            next_power_on(&DayTable::default(), &DayTable::default(), from),
            (None, false)
        );
    }

    #[test]
    fn outage_starting_exactly_now_is_not_next() {
        let today = table(&[(15, "no"), (18, "no")]);
        let (next, _) = next_outage(&today, &DayTable::default(), at(day(), 14, 0));
        assert_eq!(next, Some(period(day(), (17, 0), (18, 0))));
        let (on, _) = next_power_on(&today, &DayTable::default(), at(day(), 14, 0));
        assert_eq!(on, Some(at(day(), 15, 0)));
    }

    #[test]
    fn power_on_is_never_before_from() {
        let today = table(&[(2, "no"), (9, "second"), (15, "first"), (22, "no")]);
        let tomorrow = table(&[(4, "no")]);
        for hour in 0..24 {
            for minute in [0, 15, 30, 45] {
                let from = at(day(), hour, minute);
                if let (Some(on), _) = next_power_on(&today, &tomorrow, from) {
                    assert!(on >= from);
                }
                if let (Some(next), _) = next_outage(&today, &tomorrow, from) {
                    assert!(next.start > from);
                }
            }
        }
    }

    #[test]
    fn model_reads_group_table_from_payload() {
        let tomorrow = day().succ_opt().unwrap();
        let p = payload(&[
            (day(), json!({ GROUP: {"15": "no", "16": "no"}, "GPV1.1": {"1": "no"} })),
            (tomorrow, json!({ GROUP: {"8": "second"} })),
        ]);
        let m = model();
        assert_eq!(
            m.outages_for_date(&p, day()),
            vec![period(day(), (14, 0), (16, 0))]
        );
        assert_eq!(
            m.outages_for_date(&p, tomorrow),
            vec![period(tomorrow, (7, 30), (8, 0))]
        );
    }

    #[test]
    fn model_next_event_uses_cache() {
        let mut m = model();
        let from = at(day(), 10, 0).with_timezone(&Utc);
        assert_eq!(m.next_event(true, from), None);

        m.set_cached(payload(&[(day(), json!({ GROUP: {"13": "no"} }))]));
        assert_eq!(
            m.next_event(true, from),
            Some(NextEvent::Outage {
                period: period(day(), (12, 0), (13, 0)),
                is_tomorrow: false,
            })
        );
        assert_eq!(
            m.next_event(false, from),
            Some(NextEvent::PowerOn {
                at: at(day(), 13, 0),
                is_tomorrow: false,
            })
        );
    }

    #[test]
    fn complete_requires_today_and_tomorrow() {
        let tomorrow = day().succ_opt().unwrap();
        let m = model();
        let both = payload(&[(day(), json!({"GPV1.1": {}})), (tomorrow, json!({"GPV1.1": {}}))]);
        assert!(m.is_complete(&both, day(), tomorrow));

        let only_today = payload(&[(day(), json!({ GROUP: {} }))]);
        assert!(!m.is_complete(&only_today, day(), tomorrow));

        let only_tomorrow = payload(&[(tomorrow, json!({ GROUP: {} }))]);
        assert!(!m.is_complete(&only_tomorrow, day(), tomorrow));

        assert!(!m.is_complete(&SchedulePayload(json!({})), day(), tomorrow));
        let malformed = SchedulePayload(json!({"fact": {"data": {"not-a-timestamp": {}}}}));
        assert!(!m.is_complete(&malformed, day(), tomorrow));
    }

    #[test]
    fn fingerprint_ignores_irrelevant_content() {
        let tomorrow = day().succ_opt().unwrap();
        let yesterday = day().pred_opt().unwrap();
        let m = model();

        let base = payload(&[
            (day(), json!({ GROUP: {"1": "no", "2": "yes"}, "GPV1.1": {"1": "yes"} })),
            (tomorrow, json!({ GROUP: {"5": "first"} })),
        ]);
        let other_group = payload(&[
            (day(), json!({ GROUP: {"2": "yes", "1": "no"}, "GPV1.1": {"1": "no"} })),
            (tomorrow, json!({ GROUP: {"5": "first"}, "GPV3.1": {"7": "no"} })),
            (yesterday, json!({ GROUP: {"9": "no"} })),
        ]);
        let fp = m.fingerprint(&base, day(), tomorrow);
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, m.fingerprint(&other_group, day(), tomorrow));
    }

    #[test]
    fn fingerprint_changes_with_relevant_content() {
        let tomorrow = day().succ_opt().unwrap();
        let m = model();
        let before = payload(&[
            (day(), json!({ GROUP: {"1": "no"} })),
            (tomorrow, json!({ GROUP: {"5": "first"} })),
        ]);
        let after = payload(&[
            (day(), json!({ GROUP: {"1": "no"} })),
            (tomorrow, json!({ GROUP: {"5": "second"} })),
        ]);
        assert_ne!(
            m.fingerprint(&before, day(), tomorrow),
            m.fingerprint(&after, day(), tomorrow)
        );
    }

    #[test]
    fn fingerprint_without_fact_is_empty() {
        let m = model();
        let tomorrow = day().succ_opt().unwrap();
        assert_eq!(m.fingerprint(&SchedulePayload(json!({})), day(), tomorrow), "");
    }

    #[test]
    fn filter_keeps_only_monitored_group() {
        let m = model();
        let p = payload(&[(day(), json!({ GROUP: {"1": "no"}, "GPV1.1": {"1": "yes"} }))]);
        let filtered = m.filter_for_group(&p);
        let entry = &filtered.0["fact"]["data"][midnight_key(day())];
        assert_eq!(entry, &json!({ GROUP: {"1": "no"} }));
        assert_eq!(filtered.last_updated(), Some("2026-02-12T10:00:00+02:00"));
    }
}
