//! 予約サイトの固定値（URL・セレクタ・対象センター）
//!
//! サイト側のフォーム構造が変わった場合はここだけを修正する。

/// 予約フローの開始ページ
pub const START_URL: &str = "https://www.ncts.ie/1234/";

/// Cookie同意ボタン（表示されない場合もある）
pub const CONSENT_BUTTON: &str = "#onetrust-accept-btn-handler";

/// 車両登録番号の入力欄と送信ボタン
pub const REGISTRATION_INPUT: &str = "#RegistrationID";
pub const REGISTRATION_SUBMIT: &str = "#btnSubmitRegistration";

/// 次へ進む前にチェックが必要な確認項目
pub const ACKNOWLEDGEMENT_CHECKBOXES: [&str; 2] = ["#confirmVehicle", "#confirmTerms"];

/// 「この車両で間違いない」ボタン
pub const CONFIRM_VEHICLE: &str = "#btnVehicleConfirm";

/// 「既存の予約を変更する」ボタン
pub const MANAGE_BOOKING: &str = "#btnManageBooking";

/// 予約番号の入力欄と送信ボタン
pub const BOOKING_ID_INPUT: &str = "#BookingID";
pub const BOOKING_ID_SUBMIT: &str = "#btnSubmitBooking";

/// 予約変更の確定ボタン
pub const CONFIRM_BOOKING: &str = "#btnConfirmBooking";

/// センター一覧の拡張表示ボタン
pub const SHOW_MORE_CENTERS: &str = "#btnShowMoreCentres";

/// センター選択のドロップダウン
pub const CENTER_SELECT: &str = "#ddlCentres";

/// 日付候補（ドキュメント順＝サイト側の昇順と仮定）
pub const DATE_OPTIONS: &str = "#availableDates input[type='radio']";

/// 日付候補が持つ日時属性（`DD/MM/YYYY HH:MM:SS`）
pub const DATE_ATTRIBUTE: &str = "data-datetime";

/// チェック対象のセンター（表示名そのまま、この順で確認する）
pub const CENTERS: [&str; 5] = [
    "Deansgrange",
    "Fonthill",
    "Greenhills",
    "Northpoint 1",
    "Northpoint 2",
];
