use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};

use crate::aggregate::TeamProfile;
use crate::config::ensure_parent;
use crate::dataset::FeatureTable;
use crate::error::Result;
use crate::predict::{BettingSignal, PredictionRecord};

pub struct ExportReport {
    pub features: usize,
    pub predictions: usize,
    pub signals: usize,
    pub teams: usize,
}

/// Writes the next-round report workbook: features, predictions, corner
/// signals and team profiles, one sheet each.
pub fn export_workbook(
    path: &Path,
    features: &FeatureTable,
    predictions: &[PredictionRecord],
    signals: &[BettingSignal],
    profiles: &[TeamProfile],
) -> Result<ExportReport> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Features")?;
        write_header(sheet, &features.columns)?;
        for (idx, row) in features.rows.iter().enumerate() {
            let r = idx as u32 + 1;
            sheet.write_string(r, 0, &row.match_id)?;
            sheet.write_string(r, 1, &row.home_team)?;
            sheet.write_string(r, 2, &row.away_team)?;
            write_numbers(sheet, r, 3, &row.values())?;
        }
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Predictions")?;
        write_header(
            sheet,
            &[
                "Match", "Home", "Away", "Corners H", "Corners A", "Shots H", "Shots A",
                "Yellow H", "Yellow A", "xG H", "xG A",
            ],
        )?;
        for (idx, p) in predictions.iter().enumerate() {
            let r = idx as u32 + 1;
            sheet.write_string(r, 0, &p.match_id)?;
            sheet.write_string(r, 1, &p.home_team)?;
            sheet.write_string(r, 2, &p.away_team)?;
            write_numbers(
                sheet,
                r,
                3,
                &[
                    p.predicted_corners_home,
                    p.predicted_corners_away,
                    p.predicted_shots_home,
                    p.predicted_shots_away,
                    p.predicted_yellow_cards_home,
                    p.predicted_yellow_cards_away,
                    p.predicted_xg_home,
                    p.predicted_xg_away,
                ],
            )?;
        }
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Signals")?;
        write_header(sheet, &["Match", "Home", "Away", "Market", "Suggestion", "Rationale"])?;
        for (idx, s) in signals.iter().enumerate() {
            let r = idx as u32 + 1;
            let suggestion = s.suggestion.to_string();
            for (col, value) in [
                &s.match_id,
                &s.home_team,
                &s.away_team,
                &s.market,
                &suggestion,
                &s.rationale,
            ]
            .into_iter()
            .enumerate()
            {
                sheet.write_string(r, col as u16, value)?;
            }
        }
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Teams")?;
        write_header(
            sheet,
            &[
                "Team", "Played", "W", "D", "L", "Form", "Corners For", "Corners Against",
                "Shots", "xG", "Yellow", "Pass Acc", "SoT Ratio",
            ],
        )?;
        for (idx, t) in profiles.iter().enumerate() {
            let r = idx as u32 + 1;
            sheet.write_string(r, 0, &t.team)?;
            write_numbers(
                sheet,
                r,
                1,
                &[
                    t.matches_played as f64,
                    t.wins as f64,
                    t.draws as f64,
                    t.losses as f64,
                    t.form,
                    t.avg_corners_for,
                    t.avg_corners_against,
                    t.avg_shots,
                    t.avg_xg,
                    t.avg_yellow_cards,
                    t.pass_accuracy,
                    t.shots_on_target_ratio,
                ],
            )?;
        }
    }

    ensure_parent(path)?;
    workbook.save(path)?;

    Ok(ExportReport {
        features: features.len(),
        predictions: predictions.len(),
        signals: signals.len(),
        teams: profiles.len(),
    })
}

fn write_header<S: AsRef<str>>(sheet: &mut Worksheet, names: &[S]) -> Result<()> {
    for (col, name) in names.iter().enumerate() {
        sheet.write_string(0, col as u16, name.as_ref())?;
    }
    Ok(())
}

fn write_numbers(sheet: &mut Worksheet, row: u32, first_col: u16, values: &[f64]) -> Result<()> {
    for (offset, value) in values.iter().enumerate() {
        sheet.write_number(row, first_col + offset as u16, *value)?;
    }
    Ok(())
}
