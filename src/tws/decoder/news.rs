use super::Decoder;
use crate::error::DecodeResult;
use crate::models::NewsProvider;
use crate::tws::events::Event;
use crate::tws::scalar::ScalarReader;

impl Decoder {
    pub(super) fn decode_news_bulletins(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let msg_id = self.read_int()?;
        let msg_type = self.read_int()?;
        let message = self.read_string()?;
        let origin_exchange = self.read_string()?;
        self.emit(Event::UpdateNewsBulletin {
            msg_id,
            msg_type,
            message,
            origin_exchange,
        });
        Ok(())
    }

    pub(super) fn decode_tick_news(&mut self) -> DecodeResult<()> {
        let ticker_id = self.read_int()?;
        let time_stamp = self.read_long()?;
        let provider_code = self.read_string()?;
        let article_id = self.read_string()?;
        let headline = self.read_string()?;
        let extra_data = self.read_string()?;
        self.emit(Event::TickNews {
            ticker_id,
            time_stamp,
            provider_code,
            article_id,
            headline,
            extra_data,
        });
        Ok(())
    }

    pub(super) fn decode_news_providers(&mut self) -> DecodeResult<()> {
        let providers = self.read_list(|d| {
            Ok(NewsProvider {
                provider_code: d.read_string()?,
                provider_name: d.read_string()?,
            })
        })?;
        self.emit(Event::NewsProviders { providers });
        Ok(())
    }

    pub(super) fn decode_news_article(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let article_type = self.read_int()?;
        let article_text = self.read_string()?;
        self.emit(Event::NewsArticle { req_id, article_type, article_text });
        Ok(())
    }

    pub(super) fn decode_historical_news(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let time = self.read_string()?;
        let provider_code = self.read_string()?;
        let article_id = self.read_string()?;
        let headline = self.read_string()?;
        self.emit(Event::HistoricalNews {
            req_id,
            time,
            provider_code,
            article_id,
            headline,
        });
        Ok(())
    }

    pub(super) fn decode_historical_news_end(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let has_more = self.read_bool()?;
        self.emit(Event::HistoricalNewsEnd { req_id, has_more });
        Ok(())
    }
}
