//! Single-molitura receipt view for a 58 mm thermal printer

use axum::{
    extract::{Path, State},
    response::Html,
    Extension,
};
use chrono::Utc;

use frantoio_common::db::models::{Cassone, MolituraRiepilogo};
use frantoio_common::db::moliture;

use crate::api::{ensure_section_access, session::CurrentUser};
use crate::{ApiResult, AppState};

/// GET /stampa_ricevuta/{id}
pub async fn print_receipt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let molitura = moliture::get_riepilogo(&state.db, &id).await?;
    ensure_section_access(&user, molitura.sezione)?;

    let cassoni = moliture::cassoni(&state.db, &id).await?;

    Ok(Html(render_ricevuta(&molitura, &cassoni)))
}

fn render_ricevuta(molitura: &MolituraRiepilogo, cassoni: &[Cassone]) -> String {
    let mut righe_cassoni = String::new();
    for cassone in cassoni {
        righe_cassoni.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{} kg</td></tr>\n",
            cassone.numero_cassone, cassone.quantita
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="it">
<head>
<meta charset="UTF-8">
<title>Ricevuta molitura</title>
<style>
    body {{
        font-family: monospace;
        width: 58mm;
        margin: 0;
        padding: 2mm;
        font-size: 10px;
    }}
    h1 {{ font-size: 12px; text-align: center; margin: 2mm 0; }}
    table {{ width: 100%; border-collapse: collapse; }}
    td {{ padding: 1px 0; }}
    .num {{ text-align: right; }}
    .totale {{ border-top: 1px dashed #000; font-weight: bold; }}
    .piede {{ text-align: center; margin-top: 3mm; }}
</style>
</head>
<body onload="window.print()">
    <h1>FRANTOIO OLEARIO</h1>
    <table>
        <tr><td>Cliente:</td><td class="num">{cliente}</td></tr>
        <tr><td>Data:</td><td class="num">{data}</td></tr>
        <tr><td>Sezione:</td><td class="num">{sezione}</td></tr>
        <tr><td>Stato:</td><td class="num">{stato}</td></tr>
    </table>
    <h1>CASSONI</h1>
    <table>
{righe_cassoni}        <tr class="totale"><td>TOTALE</td><td class="num">{totale} kg</td></tr>
    </table>
    <p class="piede">Stampata il {stampata}</p>
</body>
</html>
"#,
        cliente = molitura.cliente_nome,
        data = molitura.data_ora.format("%d/%m/%Y %H:%M"),
        sezione = molitura.sezione,
        stato = molitura.stato.as_str(),
        righe_cassoni = righe_cassoni,
        totale = molitura.quantita_totale,
        stampata = Utc::now().format("%d/%m/%Y %H:%M"),
    )
}
